use std::path::PathBuf;

// where `emit` writes when no output path is given
pub const DEFAULT_OUTPUT_PATH: &str = "output.asm";

#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub print_tree: bool,
}

#[derive(Debug, Clone)]
pub struct EmitConfig {
    pub output_path: PathBuf,
    pub print_tree: bool,
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            print_tree: false,
        }
    }
}
