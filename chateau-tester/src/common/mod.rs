pub mod presenter;
pub mod storage;
pub mod util;

pub use presenter::ConsolePresenter;
pub use storage::JsonFileStorage;
pub use util::split_csv;
