pub mod alumni;
pub mod employment;
pub mod student;
pub mod token;
pub mod user;
