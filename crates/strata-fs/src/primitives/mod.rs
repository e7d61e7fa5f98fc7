pub mod dir;
pub mod file;
pub mod link;
pub mod node;

pub use dir::{create_dir, create_dir_all, remove_all, remove_unless_dir};
pub use file::{WINDOWS_MAX_PATH_LEN, check_path_len, create_new};
pub use link::{hard_link, read_link, symlink};
pub use node::{NodeKind, make_node};
