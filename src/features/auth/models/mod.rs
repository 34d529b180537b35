mod caller;

pub use caller::AuthenticatedCaller;
