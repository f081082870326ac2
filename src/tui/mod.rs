pub mod app;
pub mod editor;
pub mod intent;
pub mod render;
pub mod session;
pub mod theme;
pub mod view;
pub mod wrap;

pub use app::run;
