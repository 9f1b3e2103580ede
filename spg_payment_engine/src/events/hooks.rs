use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    WalletCreditedEvent,
    WalletDebitedEvent,
    WithdrawalDecidedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub wallet_credited_producer: Vec<EventProducer<WalletCreditedEvent>>,
    pub wallet_debited_producer: Vec<EventProducer<WalletDebitedEvent>>,
    pub withdrawal_decided_producer: Vec<EventProducer<WithdrawalDecidedEvent>>,
}

pub struct EventHandlers {
    pub on_wallet_credited: Option<EventHandler<WalletCreditedEvent>>,
    pub on_wallet_debited: Option<EventHandler<WalletDebitedEvent>>,
    pub on_withdrawal_decided: Option<EventHandler<WithdrawalDecidedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_wallet_credited = hooks.on_wallet_credited.map(|f| EventHandler::new(buffer_size, f));
        let on_wallet_debited = hooks.on_wallet_debited.map(|f| EventHandler::new(buffer_size, f));
        let on_withdrawal_decided = hooks.on_withdrawal_decided.map(|f| EventHandler::new(buffer_size, f));
        Self { on_wallet_credited, on_wallet_debited, on_withdrawal_decided }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_wallet_credited {
            result.wallet_credited_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_wallet_debited {
            result.wallet_debited_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_withdrawal_decided {
            result.withdrawal_decided_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_wallet_credited {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_wallet_debited {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_withdrawal_decided {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_wallet_credited: Option<Handler<WalletCreditedEvent>>,
    pub on_wallet_debited: Option<Handler<WalletDebitedEvent>>,
    pub on_withdrawal_decided: Option<Handler<WithdrawalDecidedEvent>>,
}

impl EventHooks {
    pub fn on_wallet_credited<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(WalletCreditedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_wallet_credited = Some(Arc::new(f));
        self
    }

    pub fn on_wallet_debited<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(WalletDebitedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_wallet_debited = Some(Arc::new(f));
        self
    }

    pub fn on_withdrawal_decided<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(WithdrawalDecidedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_withdrawal_decided = Some(Arc::new(f));
        self
    }
}
