#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferType {
    Vertex,
    Index,
    Uniform,
    Storage,
    Indirect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferStorage {
    DeviceLocal,
    HostVisible,
    HostVisibleDeviceLocal,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct BufferUsage: u32 {
        const VERTEX = 1 << 0;
        const INDEX = 1 << 1;
        const UNIFORM = 1 << 2;
        const STORAGE = 1 << 3;
        const INDIRECT = 1 << 4;
        const TRANSFER_SRC = 1 << 5;
        const TRANSFER_DST = 1 << 6;
    }
}

impl BufferType {
    /// Flags inferred from type, per §4.3: callers never author `BufferUsage` by hand for the
    /// primary role, only pick `storage` and (for host-visible buffers) extend with
    /// `TRANSFER_DST` for staged uploads.
    pub fn inferred_usage(self) -> BufferUsage {
        match self {
            BufferType::Vertex => BufferUsage::VERTEX | BufferUsage::TRANSFER_DST,
            BufferType::Index => BufferUsage::INDEX | BufferUsage::TRANSFER_DST,
            BufferType::Uniform => BufferUsage::UNIFORM | BufferUsage::TRANSFER_DST,
            BufferType::Storage => BufferUsage::STORAGE | BufferUsage::TRANSFER_DST,
            BufferType::Indirect => BufferUsage::INDIRECT | BufferUsage::TRANSFER_DST,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub size: u64,
    pub ty: BufferType,
    pub storage: BufferStorage,
}

impl BufferDescriptor {
    /// `map`/`unmap` are only valid on buffers whose storage makes the memory CPU-addressable.
    pub fn is_mappable(&self) -> bool {
        matches!(
            self.storage,
            BufferStorage::HostVisible | BufferStorage::HostVisibleDeviceLocal
        )
    }
}
