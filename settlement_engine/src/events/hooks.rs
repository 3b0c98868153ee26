use std::sync::Arc;

use log::*;

use crate::events::{
    CatalogChangedEvent,
    EventHandler,
    EventProducer,
    Handler,
    HookFuture,
    OrderCreatedEvent,
    OrderStatusChangedEvent,
    SlotChangedEvent,
    WithdrawalChangedEvent,
};

/// The publishing half of every registered hook. Each API holds a clone.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_created_producer: Vec<EventProducer<OrderCreatedEvent>>,
    pub order_status_changed_producer: Vec<EventProducer<OrderStatusChangedEvent>>,
    pub catalog_changed_producer: Vec<EventProducer<CatalogChangedEvent>>,
    pub slot_changed_producer: Vec<EventProducer<SlotChangedEvent>>,
    pub withdrawal_changed_producer: Vec<EventProducer<WithdrawalChangedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_created(&self, event: OrderCreatedEvent) {
        for producer in &self.order_created_producer {
            trace!("📬️ Notifying order created hook subscribers");
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_order_status_changed(&self, event: OrderStatusChangedEvent) {
        for producer in &self.order_status_changed_producer {
            trace!("📬️ Notifying order status hook subscribers");
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_catalog_changed(&self, event: CatalogChangedEvent) {
        for producer in &self.catalog_changed_producer {
            trace!("📬️ Notifying catalog hook subscribers");
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_slot_changed(&self, event: SlotChangedEvent) {
        for producer in &self.slot_changed_producer {
            trace!("📬️ Notifying slot hook subscribers");
            producer.publish_event(event.clone()).await;
        }
    }

    pub async fn publish_withdrawal_changed(&self, event: WithdrawalChangedEvent) {
        for producer in &self.withdrawal_changed_producer {
            trace!("📬️ Notifying withdrawal hook subscribers");
            producer.publish_event(event.clone()).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_created: Option<EventHandler<OrderCreatedEvent>>,
    pub on_order_status_changed: Option<EventHandler<OrderStatusChangedEvent>>,
    pub on_catalog_changed: Option<EventHandler<CatalogChangedEvent>>,
    pub on_slot_changed: Option<EventHandler<SlotChangedEvent>>,
    pub on_withdrawal_changed: Option<EventHandler<WithdrawalChangedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        Self {
            on_order_created: hooks.on_order_created.map(|f| EventHandler::new(buffer_size, f)),
            on_order_status_changed: hooks.on_order_status_changed.map(|f| EventHandler::new(buffer_size, f)),
            on_catalog_changed: hooks.on_catalog_changed.map(|f| EventHandler::new(buffer_size, f)),
            on_slot_changed: hooks.on_slot_changed.map(|f| EventHandler::new(buffer_size, f)),
            on_withdrawal_changed: hooks.on_withdrawal_changed.map(|f| EventHandler::new(buffer_size, f)),
        }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_created {
            result.order_created_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_status_changed {
            result.order_status_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_catalog_changed {
            result.catalog_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_slot_changed {
            result.slot_changed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_withdrawal_changed {
            result.withdrawal_changed_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns one task per registered hook. Each task ends once every producer feeding it has been dropped.
    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_created {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_status_changed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_catalog_changed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_slot_changed {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_withdrawal_changed {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_created: Option<Handler<OrderCreatedEvent>>,
    pub on_order_status_changed: Option<Handler<OrderStatusChangedEvent>>,
    pub on_catalog_changed: Option<Handler<CatalogChangedEvent>>,
    pub on_slot_changed: Option<Handler<SlotChangedEvent>>,
    pub on_withdrawal_changed: Option<Handler<WithdrawalChangedEvent>>,
}

impl EventHooks {
    pub fn on_order_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderCreatedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_created = Some(Arc::new(f));
        self
    }

    pub fn on_order_status_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderStatusChangedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_order_status_changed = Some(Arc::new(f));
        self
    }

    pub fn on_catalog_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CatalogChangedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_catalog_changed = Some(Arc::new(f));
        self
    }

    pub fn on_slot_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(SlotChangedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_slot_changed = Some(Arc::new(f));
        self
    }

    pub fn on_withdrawal_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(WithdrawalChangedEvent) -> HookFuture) + Send + Sync + 'static {
        self.on_withdrawal_changed = Some(Arc::new(f));
        self
    }
}
