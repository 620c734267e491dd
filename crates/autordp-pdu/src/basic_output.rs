pub mod bitmap;
pub mod fast_path;
pub mod palette;
pub mod pointer;
pub mod update;
