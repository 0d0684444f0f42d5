mod app;
mod components;
mod state;

pub use app::HopeSwapApp;
