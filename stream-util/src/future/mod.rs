mod oneshot_dispatcher;

pub mod future_helpers;

pub use oneshot_dispatcher::OneShotDispatcher;
