pub mod console;
pub mod renderer;
