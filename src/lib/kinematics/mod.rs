mod speed;

pub use self::speed::*;
