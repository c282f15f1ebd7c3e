pub mod favorites;
pub mod listings;
pub mod session;
pub mod storage;
