use crate::execution::{Execution, ExecutionQueue, ExecutionType};
use crate::order::{Order, OrderData, OrderId, Price, Quantity, Side, Symbol};
use crate::sequencer::Sequencer;

/// Raised when the next resting order to fill belongs to the taker's own
/// client. Matching stops on the spot; executions already produced against
/// other clients stand.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct SelfTrade;

/// A price level: the FIFO queue of resting orders at one `(side, price)`.
///
/// Implemented as a flat vector of orders to keep iteration cache friendly.
/// Orders leave the queue front-first as they fill, so popping is not
/// required: a filled or cancelled order has its shares set to zero and
/// becomes a hole that iteration skips and [`compact`](Self::compact)
/// reclaims. The `size` and `total_volume` aggregates count live orders
/// only.
#[derive(Debug)]
pub(crate) struct Limit {
    side: Side,
    price: Price,
    orders: Vec<Order>,
    /// Number of orders with volume. `(size == 0)` is the level-empty
    /// condition that removes the level from its ladder.
    size: usize,
    /// Sum of remaining shares across orders with volume.
    total_volume: Quantity,
}

impl Limit {
    pub(crate) fn new(price: Price, side: Side) -> Self {
        Self {
            side,
            price,
            orders: Vec::new(),
            size: 0,
            total_volume: Quantity::zero(),
        }
    }

    pub(crate) fn price(&self) -> Price {
        self.price
    }

    /// Count of resting orders at this level.
    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// Sum of remaining shares across resting orders at this level.
    pub(crate) fn total_volume(&self) -> Quantity {
        self.total_volume
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Appends an order at the tail of the queue.
    pub(crate) fn push(&mut self, order: Order) {
        debug_assert_eq!(self.side, order.side());
        debug_assert_eq!(self.price, order.limit_price());
        debug_assert!(order.has_volume());
        self.size += 1;
        self.total_volume = self.total_volume.saturating_add(order.shares());
        self.orders.push(order);
    }

    /// Returns the resting order identified by `id`, if it is live at this
    /// level.
    pub(crate) fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders().find(|order| order.id() == id)
    }

    /// Iterates the live orders in time priority, skipping holes.
    pub(crate) fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().filter(|order| order.has_volume())
    }

    /// Removes the order identified by `id`, returning its remaining shares.
    ///
    /// The order becomes a hole; holes are reclaimed once they outnumber the
    /// live orders, so repeated cancels at a hot level stay amortized O(1).
    pub(crate) fn cancel(&mut self, id: OrderId) -> Option<Quantity> {
        let order = self
            .orders
            .iter_mut()
            .find(|order| order.has_volume() && order.id() == id)?;
        let remaining = order.shares();
        order.shares = Quantity::zero();
        self.size -= 1;
        self.total_volume = self.total_volume.saturating_sub(remaining);
        if self.orders.len() >= 2 * self.size {
            self.compact();
        }
        Some(remaining)
    }

    /// Drops all holes from the backing storage.
    pub(crate) fn compact(&mut self) {
        self.orders.retain(|order| order.has_volume());
    }

    /// Fills the taker against this level's queue, head first.
    ///
    /// Walks the live orders in time priority, producing one [`Execution`]
    /// per maker touched, until either the taker or the level is exhausted.
    /// Fully filled makers are reported through `on_remove` so the book can
    /// drop them from its order index.
    ///
    /// Hitting a maker from the taker's own client stops the walk with
    /// [`SelfTrade`]; everything executed up to that point stands.
    pub(crate) fn fill<S: Sequencer>(
        &mut self,
        taker: &mut OrderData,
        taker_id: OrderId,
        symbol: Symbol,
        sequencer: &mut S,
        executions: &mut ExecutionQueue,
        on_remove: &mut dyn FnMut(OrderId),
    ) -> Result<(), SelfTrade> {
        let Limit {
            side,
            price,
            orders,
            size,
            total_volume,
        } = self;
        let price = *price;
        debug_assert_eq!(*side, taker.side().opposite());

        for maker in orders.iter_mut() {
            if !maker.has_volume() {
                continue;
            }
            if maker.client_id() == taker.client_id() {
                return Err(SelfTrade);
            }

            let exec_volume = maker.shares().min(taker.shares());
            let maker_exec_type = if exec_volume == maker.shares() {
                ExecutionType::FullFill
            } else {
                ExecutionType::PartialFill
            };
            let taker_exec_type = if exec_volume == taker.shares() {
                ExecutionType::FullFill
            } else {
                ExecutionType::PartialFill
            };

            maker.fill(price, exec_volume);
            taker.fill(price, exec_volume);
            *total_volume = total_volume.saturating_sub(exec_volume);

            executions.push(Execution {
                symbol,
                execution_id: sequencer.next_execution_id(),
                maker_order_id: maker.id(),
                taker_order_id: taker_id,
                exec_price: price,
                exec_size: exec_volume,
                maker_side: maker.side(),
                taker_side: taker.side(),
                maker_exec_type,
                taker_exec_type,
                maker_client_id: maker.client_id(),
                taker_client_id: taker.client_id(),
                maker_cum_qty: maker.executed_quantity(),
                taker_cum_qty: taker.executed_quantity(),
                maker_leaves_qty: maker.shares(),
                taker_leaves_qty: taker.shares(),
                maker_avg_price: maker.avg_price(),
                taker_avg_price: taker.avg_price(),
            });

            if !maker.has_volume() {
                *size -= 1;
                on_remove(maker.id());
            }
            if taker.is_filled() {
                break;
            }
        }
        Ok(())
    }
}
