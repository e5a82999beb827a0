pub mod monitor;

pub use monitor::TuiPresenter;
