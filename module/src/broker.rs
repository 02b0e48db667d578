//! Message bus seam.
//!
//! The gateway host owns the real bus; the module only needs to hand it
//! messages. [`MemoryBroker`] collects them in process, which is what the
//! host harness and the tests use.

use std::rc::Rc;
use std::sync::{Arc, Mutex};

use crate::error::BrokerError;
use crate::message::Message;

/// Destination for messages published by the module.
pub trait Broker {
    /// Publishes one message.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] if the bus rejects the message.
    fn publish(&self, message: Message) -> Result<(), BrokerError>;
}

impl<B: Broker + ?Sized> Broker for &B {
    fn publish(&self, message: Message) -> Result<(), BrokerError> {
        (**self).publish(message)
    }
}

impl<B: Broker + ?Sized> Broker for Rc<B> {
    fn publish(&self, message: Message) -> Result<(), BrokerError> {
        (**self).publish(message)
    }
}

impl<B: Broker + ?Sized> Broker for Arc<B> {
    fn publish(&self, message: Message) -> Result<(), BrokerError> {
        (**self).publish(message)
    }
}

/// An in-process broker that records every published message.
///
/// # Examples
///
/// ```
/// use sqlite_gateway_module::{Broker, MemoryBroker, Message};
///
/// let broker = MemoryBroker::new();
/// broker.publish(Message::new("hello")).unwrap();
/// assert_eq!(broker.take()[0].content(), b"hello");
/// assert!(broker.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MemoryBroker {
    messages: Mutex<Vec<Message>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything published so far.
    pub fn take(&self) -> Vec<Message> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Message>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.messages.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Broker for MemoryBroker {
    fn publish(&self, message: Message) -> Result<(), BrokerError> {
        self.lock().push(message);
        Ok(())
    }
}
