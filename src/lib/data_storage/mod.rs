mod data_storage;

pub use self::data_storage::*;
