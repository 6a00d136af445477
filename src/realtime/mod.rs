mod hub;
mod ws;

pub use hub::ObserverHub;
pub use ws::ws_handler;
