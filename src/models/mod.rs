pub mod courier;
pub mod events;
pub mod offer;
pub mod order;
pub mod trip;
