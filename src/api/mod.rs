pub mod compliance;
pub mod state;

pub use compliance::router;
pub use state::AppState;
