use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::execution::{Execution, ExecutionQueue};
use crate::level::Limit;
use crate::order::{Order, OrderData, OrderId, Price, Quantity, Side, Symbol};
use crate::sequencer::{Monotonic, Sequencer};

/// Why a submission was refused. The book is left consistent either way; see
/// [`SubmitError::SelfTradeRejected`] for what "consistent" means there.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The intent failed validation; the book is untouched.
    #[error("invalid order: {reason}")]
    InvalidOrder { reason: &'static str },
    /// Matching reached a resting order from the taker's own client.
    ///
    /// Executions already produced by this submission against other clients
    /// stay on the queue; the taker's residual is discarded, not rested.
    #[error("order would cross a resting order from the same client")]
    SelfTradeRejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CancelError {
    #[error("unknown order id {0:?}")]
    UnknownOrder(OrderId),
}

/// How a valid submission ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "order_id")]
pub enum SubmitOutcome {
    /// The intent matched completely on arrival; nothing rests.
    Filled,
    /// The residual rests on the book under the assigned id.
    Rested(OrderId),
}

/// One level of aggregate book depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: Price,
    pub volume: Quantity,
    pub orders: usize,
}

/// A side-specific ladder key: controls both the sort direction of the
/// ladder (best price first) and the crossing predicate against a taker's
/// limit.
trait LadderPrice: Copy + Ord + From<Price> {
    fn side() -> Side;

    fn price(self) -> Price;

    /// Whether a resting level at this price is reachable by a taker on the
    /// opposite side limited at `taker_limit`.
    fn crosses(self, taker_limit: Price) -> bool;
}

/// Ask prices sort ascending: the cheapest offer is the best.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct AskPrice(Price);

impl From<Price> for AskPrice {
    fn from(value: Price) -> Self {
        Self(value)
    }
}

impl LadderPrice for AskPrice {
    fn side() -> Side {
        Side::Sell
    }

    fn price(self) -> Price {
        self.0
    }

    fn crosses(self, taker_limit: Price) -> bool {
        self.0 <= taker_limit
    }
}

/// Bid prices sort descending: the highest bid is the best.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct BidPrice(Price);

impl Ord for BidPrice {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // inverse ordering compared to the underlying price
        other.0.cmp(&self.0)
    }
}

impl PartialOrd for BidPrice {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Price> for BidPrice {
    fn from(value: Price) -> Self {
        Self(value)
    }
}

impl LadderPrice for BidPrice {
    fn side() -> Side {
        Side::Buy
    }

    fn price(self) -> Price {
        self.0
    }

    fn crosses(self, taker_limit: Price) -> bool {
        self.0 >= taker_limit
    }
}

/// The ordered index of price levels on one side of the book.
///
/// Parameterized by the price wrapper so that iteration always runs from
/// best to worst: ascending for asks, descending for bids. Levels are
/// present iff they hold at least one live order.
#[derive(Debug)]
struct Ladder<P> {
    inner: BTreeMap<P, Limit>,
}

impl<P: LadderPrice> Ladder<P> {
    fn new() -> Self {
        Self {
            inner: BTreeMap::new(),
        }
    }

    fn best_price(&self) -> Option<Price> {
        self.inner.first_key_value().map(|(price, _)| price.price())
    }

    fn get(&self, price: Price) -> Option<&Limit> {
        self.inner.get(&P::from(price))
    }

    fn get_mut(&mut self, price: Price) -> Option<&mut Limit> {
        self.inner.get_mut(&P::from(price))
    }

    fn find_or_insert(&mut self, price: Price) -> &mut Limit {
        self.inner
            .entry(P::from(price))
            .or_insert_with(|| Limit::new(price, P::side()))
    }

    fn remove(&mut self, price: Price) {
        self.inner.remove(&P::from(price));
    }

    /// Iterates the levels from best to worst.
    fn levels(&self) -> impl Iterator<Item = &Limit> {
        self.inner.values()
    }

    /// Matches the taker against this ladder, best level first.
    ///
    /// Stops when the best level no longer crosses the taker's limit, when
    /// the taker is exhausted, or when the ladder runs dry. Levels emptied
    /// by matching are removed before the loop re-enters; partially drained
    /// levels are compacted in place.
    fn match_order<S: Sequencer>(
        &mut self,
        taker: &mut OrderData,
        taker_id: OrderId,
        symbol: Symbol,
        sequencer: &mut S,
        executions: &mut ExecutionQueue,
        on_remove: &mut dyn FnMut(OrderId),
    ) -> Result<(), crate::level::SelfTrade> {
        while !taker.is_filled() {
            let Some(mut entry) = self.inner.first_entry() else {
                break;
            };
            if !entry.key().crosses(taker.limit_price()) {
                break;
            }
            let level = entry.get_mut();
            let result = level.fill(taker, taker_id, symbol, sequencer, executions, on_remove);
            if level.is_empty() {
                entry.remove();
            } else {
                level.compact();
            }
            result?;
        }
        Ok(())
    }
}

/// The matching coordinator for one symbol.
///
/// Owns both ladders, the order index, the execution queue, and the id
/// sequencer. Strictly single-threaded: each submission or cancellation
/// runs to completion before the next; callers serialize access
/// externally.
#[derive(Debug)]
pub struct Book<S: Sequencer = Monotonic> {
    symbol: Symbol,
    bids: Ladder<BidPrice>,
    asks: Ladder<AskPrice>,
    /// Where each resting order lives: `(side, price)` selects the ladder
    /// and the level. An id is present iff the order rests on the book.
    index: HashMap<OrderId, (Side, Price)>,
    executions: ExecutionQueue,
    sequencer: S,
}

impl Book<Monotonic> {
    /// Creates an empty book with an in-process id sequencer.
    pub fn new(symbol: Symbol) -> Self {
        Self::with_sequencer(symbol, Monotonic::new())
    }
}

impl<S: Sequencer> Book<S> {
    /// Creates an empty book drawing ids from an external sequencer.
    pub fn with_sequencer(symbol: Symbol, sequencer: S) -> Self {
        Self {
            symbol,
            bids: Ladder::new(),
            asks: Ladder::new(),
            index: HashMap::new(),
            executions: ExecutionQueue::new(),
            sequencer,
        }
    }

    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    /// Submits an order intent.
    ///
    /// The intent is matched against the opposite ladder in price/time
    /// priority; any residual rests on its own side under a freshly issued
    /// id. Executions produced along the way are appended to the queue and
    /// picked up via [`drain_executions`](Self::drain_executions).
    pub fn submit(&mut self, mut intent: OrderData) -> Result<SubmitOutcome, SubmitError> {
        if intent.shares().is_zero() {
            return Err(SubmitError::InvalidOrder {
                reason: "shares must be positive",
            });
        }
        if intent.limit_price().is_zero() {
            return Err(SubmitError::InvalidOrder {
                reason: "limit price must be positive",
            });
        }

        let taker_id = self.sequencer.next_order_id();

        let Self {
            symbol,
            bids,
            asks,
            index,
            executions,
            sequencer,
        } = self;
        let mut on_remove = |id: OrderId| {
            let _resting = index.remove(&id);
            crate::debug_assert_some!(_resting);
        };
        let matched = match intent.side() {
            Side::Buy => asks.match_order(
                &mut intent,
                taker_id,
                *symbol,
                sequencer,
                executions,
                &mut on_remove,
            ),
            Side::Sell => bids.match_order(
                &mut intent,
                taker_id,
                *symbol,
                sequencer,
                executions,
                &mut on_remove,
            ),
        };
        if matched.is_err() {
            // prior executions of this submission stand; the residual does not rest
            return Err(SubmitError::SelfTradeRejected);
        }

        if intent.is_filled() {
            return Ok(SubmitOutcome::Filled);
        }
        let order = Order::from_intent(taker_id, &intent);
        match intent.side() {
            Side::Buy => self.bids.find_or_insert(intent.limit_price()).push(order),
            Side::Sell => self.asks.find_or_insert(intent.limit_price()).push(order),
        }
        self.index
            .insert(taker_id, (intent.side(), intent.limit_price()));
        Ok(SubmitOutcome::Rested(taker_id))
    }

    /// Cancels a resting order, removing it from its level and the index.
    pub fn cancel(&mut self, id: OrderId) -> Result<(), CancelError> {
        let (side, price) = self
            .index
            .remove(&id)
            .ok_or(CancelError::UnknownOrder(id))?;
        match side {
            Side::Buy => cancel_in(&mut self.bids, price, id),
            Side::Sell => cancel_in(&mut self.asks, price, id),
        }
        .expect("invariant violated: indexed order must rest at its recorded level");
        Ok(())
    }

    /// The best (highest) bid price, if any bids rest.
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_price()
    }

    /// The best (lowest) ask price, if any asks rest.
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_price()
    }

    /// Aggregate depth for one side, best level first, at most `levels`
    /// entries.
    pub fn depth(&self, side: Side, levels: usize) -> Vec<DepthLevel> {
        match side {
            Side::Buy => depth_of(&self.bids, levels),
            Side::Sell => depth_of(&self.asks, levels),
        }
    }

    /// Returns if an order with `id` currently rests on the book.
    pub fn contains(&self, id: OrderId) -> bool {
        self.index.contains_key(&id)
    }

    /// Returns the resting order identified by `id`, if any.
    pub fn get_order(&self, id: OrderId) -> Option<&Order> {
        let (side, price) = self.index.get(&id)?;
        let level = match side {
            Side::Buy => self.bids.get(*price)?,
            Side::Sell => self.asks.get(*price)?,
        };
        level.get(id)
    }

    /// Transfers all queued executions to the caller in production order.
    pub fn drain_executions(&mut self) -> Vec<Execution> {
        self.executions.drain()
    }

    /// Number of executions awaiting pickup.
    pub fn pending_executions(&self) -> usize {
        self.executions.len()
    }
}

fn cancel_in<P: LadderPrice>(ladder: &mut Ladder<P>, price: Price, id: OrderId) -> Option<Quantity> {
    let level = ladder.get_mut(price)?;
    let removed = level.cancel(id);
    if level.is_empty() {
        ladder.remove(price);
    }
    removed
}

fn depth_of<P: LadderPrice>(ladder: &Ladder<P>, levels: usize) -> Vec<DepthLevel> {
    ladder
        .levels()
        .take(levels)
        .map(|level| DepthLevel {
            price: level.price(),
            volume: level.total_volume(),
            orders: level.size(),
        })
        .collect()
}
