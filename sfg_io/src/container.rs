use crate::istream::IStream;
use crate::ostream::OStream;

/// Writes `[u32 count][T0][T1]...[Tn-1]` using `write_item` for each element.
pub fn write_container<T>(os: &mut OStream, items: &[T], mut write_item: impl FnMut(&mut OStream, &T)) {
    os.write_u32(items.len() as u32);
    for item in items {
        write_item(os, item);
    }
}

/// Reads a `[u32 count][T0][T1]...[Tn-1]` container back using `read_item`.
pub fn read_container<T>(is: &mut IStream, mut read_item: impl FnMut(&mut IStream) -> T) -> Vec<T> {
    let count = is.read_u32() as usize;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(read_item(is));
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_container_of_u32() {
        let mut os = OStream::new();
        write_container(&mut os, &[1u32, 2, 3], |os, item| os.write_u32(*item));

        let bytes = os.into_bytes();
        let mut is = IStream::new(&bytes);
        let items = read_container(&mut is, |is| is.read_u32());
        assert_eq!(items, vec![1, 2, 3]);
    }
}
