mod batch;
mod compare;
mod init;
mod upload;

pub use self::batch::batch;
pub use self::compare::compare;
pub use self::init::init;
pub use self::upload::upload;
