use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::order::{AvgPrice, ClientId, ExecutionId, OrderId, Price, Quantity, Side, Symbol};

/// Whether an execution leaves its order with residual shares.
///
/// A single trade carries one type per side: the maker can be fully filled
/// while the taker still has shares to work, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionType {
    PartialFill,
    FullFill,
}

/// The record of a single trade between a resting maker and an incoming
/// taker.
///
/// Executions are constructed inside matching with both sides' state already
/// updated for this fill, appended to the book's [`ExecutionQueue`], and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub symbol: Symbol,
    pub execution_id: ExecutionId,
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    /// Trades happen at the resting price, so this is always the maker's
    /// limit price.
    pub exec_price: Price,
    pub exec_size: Quantity,
    pub maker_side: Side,
    pub taker_side: Side,
    pub maker_exec_type: ExecutionType,
    pub taker_exec_type: ExecutionType,
    pub maker_client_id: ClientId,
    pub taker_client_id: ClientId,
    /// Cumulative filled quantity on the maker, including this execution.
    pub maker_cum_qty: Quantity,
    pub taker_cum_qty: Quantity,
    /// Shares left open on the maker after this execution.
    pub maker_leaves_qty: Quantity,
    pub taker_leaves_qty: Quantity,
    pub maker_avg_price: AvgPrice,
    pub taker_avg_price: AvgPrice,
}

/// The FIFO buffer of executions awaiting pickup by the session layer.
///
/// Matching appends; [`drain`](Self::drain) hands the accumulated records to
/// the caller in production order and empties the buffer. Nothing blocks
/// here.
#[derive(Debug, Default)]
pub struct ExecutionQueue {
    inner: VecDeque<Execution>,
}

impl ExecutionQueue {
    pub fn new() -> Self {
        Self {
            inner: VecDeque::new(),
        }
    }

    pub(crate) fn push(&mut self, execution: Execution) {
        self.inner.push_back(execution);
    }

    /// Transfers ownership of all queued executions to the caller.
    pub fn drain(&mut self) -> Vec<Execution> {
        self.inner.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn execution(id: u64) -> Execution {
        Execution {
            symbol: Symbol::try_from_str("AAPL").unwrap(),
            execution_id: ExecutionId::new(id),
            maker_order_id: OrderId::new(1),
            taker_order_id: OrderId::new(2),
            exec_price: Price::new(100),
            exec_size: Quantity::new(5),
            maker_side: Side::Buy,
            taker_side: Side::Sell,
            maker_exec_type: ExecutionType::PartialFill,
            taker_exec_type: ExecutionType::FullFill,
            maker_client_id: ClientId::new(10),
            taker_client_id: ClientId::new(20),
            maker_cum_qty: Quantity::new(5),
            taker_cum_qty: Quantity::new(5),
            maker_leaves_qty: Quantity::new(3),
            taker_leaves_qty: Quantity::zero(),
            maker_avg_price: AvgPrice::from_ticks(100),
            taker_avg_price: AvgPrice::from_ticks(100),
        }
    }

    #[test]
    fn drain_empties_the_queue_in_fifo_order() {
        let mut queue = ExecutionQueue::new();
        queue.push(execution(1));
        queue.push(execution(2));
        queue.push(execution(3));
        assert_eq!(queue.len(), 3);

        let drained = queue.drain();
        let ids: Vec<u64> = drained.iter().map(|e| e.execution_id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_of_empty_queue_yields_nothing() {
        let mut queue = ExecutionQueue::new();
        assert!(queue.drain().is_empty());
    }
}
