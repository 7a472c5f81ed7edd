//! Both ends of the relay as seen from outside: the producer that posts
//! payloads and the subscriber that receives frames.

pub mod producer;
pub mod subscriber;

pub use producer::Producer;
pub use subscriber::SubscriberClient;
