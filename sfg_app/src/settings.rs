use sfg_gfx::RenderFrameDefinition;

/// App-wide tunables. Supersedes the original's compiled-in constants (§9 Open Question #4):
/// defaults below match `App::Settings`'s field initializers one for one.
#[derive(Clone, Debug)]
pub struct Settings {
    pub window_title: String,
    pub window_size: (u32, u32),
    pub fixed_update_rate: u32,
    pub max_accumulated_updates: u32,
    pub max_command_streams_per_frame: u32,
    pub throttle_cpu: bool,
    pub render_frame: RenderFrameDefinition,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            window_title: "SFG".to_string(),
            window_size: (500, 500),
            fixed_update_rate: 60,
            max_accumulated_updates: 4,
            max_command_streams_per_frame: 32,
            throttle_cpu: false,
            render_frame: RenderFrameDefinition::default(),
        }
    }
}
