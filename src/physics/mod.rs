pub mod ballistics;
pub mod reflect;
pub mod trajectory;
