//! Single-symbol, in-memory matching engine with price/time priority.
//!
//! Incoming limit orders are matched against resting orders on the opposite
//! side of the book; residual quantity rests as new liquidity. Each match
//! produces an [`Execution`] record carrying both sides' fill state, queued
//! for pickup by a session layer.
//!
//! The core is a synchronous, single-threaded state machine: no operation
//! suspends or blocks, and callers serialize access externally.

pub mod book;
pub mod execution;
pub mod order;
pub mod sequencer;

pub(crate) mod level;
pub(crate) mod macros;

pub use book::{Book, CancelError, DepthLevel, SubmitError, SubmitOutcome};
pub use execution::{Execution, ExecutionQueue, ExecutionType};
pub use order::{
    AvgPrice, ClientId, ExecutionId, Order, OrderData, OrderId, Price, Quantity, Side, Symbol,
};
pub use sequencer::{Monotonic, Sequencer};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assert_ok, assert_some};

    fn book() -> Book {
        Book::new(Symbol::try_from_str("AAPL").unwrap())
    }

    fn intent(client: u64, side: Side, price: u64, shares: u64) -> OrderData {
        OrderData::new(
            ClientId::new(client),
            side,
            Price::new(price),
            Quantity::new(shares),
        )
    }

    fn rest(book: &mut Book, client: u64, side: Side, price: u64, shares: u64) -> OrderId {
        match assert_ok!(book.submit(intent(client, side, price, shares))) {
            SubmitOutcome::Rested(id) => id,
            SubmitOutcome::Filled => panic!("order was expected to rest"),
        }
    }

    #[test]
    fn rest_then_match() {
        // a bid rests, then a smaller sell takes part of it
        let mut book = book();
        rest(&mut book, 1, Side::Buy, 100, 10);
        assert!(book.drain_executions().is_empty());
        assert_eq!(book.best_bid(), Some(Price::new(100)));
        assert_eq!(
            book.depth(Side::Buy, 1),
            vec![DepthLevel {
                price: Price::new(100),
                volume: Quantity::new(10),
                orders: 1,
            }]
        );

        let outcome = assert_ok!(book.submit(intent(2, Side::Sell, 100, 4)));
        assert_eq!(outcome, SubmitOutcome::Filled);

        let executions = book.drain_executions();
        assert_eq!(executions.len(), 1);
        let execution = &executions[0];
        assert_eq!(execution.exec_price, Price::new(100));
        assert_eq!(execution.exec_size, Quantity::new(4));
        assert_eq!(execution.maker_exec_type, ExecutionType::PartialFill);
        assert_eq!(execution.taker_exec_type, ExecutionType::FullFill);
        assert_eq!(execution.maker_leaves_qty, Quantity::new(6));
        assert_eq!(execution.taker_leaves_qty, Quantity::zero());
        assert_eq!(execution.maker_side, Side::Buy);
        assert_eq!(execution.taker_side, Side::Sell);

        assert_eq!(book.best_bid(), Some(Price::new(100)));
        assert_eq!(
            book.depth(Side::Buy, 1),
            vec![DepthLevel {
                price: Price::new(100),
                volume: Quantity::new(6),
                orders: 1,
            }]
        );
    }

    #[test]
    fn time_priority_at_one_level() {
        // two bids at the same price; the earlier one fills first
        let mut book = book();
        let first = rest(&mut book, 1, Side::Buy, 100, 5);
        let second = rest(&mut book, 2, Side::Buy, 100, 5);

        let outcome = assert_ok!(book.submit(intent(3, Side::Sell, 100, 6)));
        assert_eq!(outcome, SubmitOutcome::Filled);

        let executions = book.drain_executions();
        assert_eq!(executions.len(), 2);

        assert_eq!(executions[0].maker_order_id, first);
        assert_eq!(executions[0].exec_size, Quantity::new(5));
        assert_eq!(executions[0].maker_exec_type, ExecutionType::FullFill);
        assert_eq!(executions[0].taker_exec_type, ExecutionType::PartialFill);

        assert_eq!(executions[1].maker_order_id, second);
        assert_eq!(executions[1].exec_size, Quantity::new(1));
        assert_eq!(executions[1].maker_exec_type, ExecutionType::PartialFill);
        assert_eq!(executions[1].taker_exec_type, ExecutionType::FullFill);

        assert!(!book.contains(first));
        assert!(book.contains(second));
    }

    #[test]
    fn taker_gets_price_improvement_walking_levels() {
        // the taker's limit admits both ask levels; each trade happens at
        // the resting price
        let mut book = book();
        rest(&mut book, 1, Side::Sell, 101, 3);
        let far = rest(&mut book, 2, Side::Sell, 102, 5);

        let outcome = assert_ok!(book.submit(intent(3, Side::Buy, 102, 7)));
        assert_eq!(outcome, SubmitOutcome::Filled);

        let executions = book.drain_executions();
        assert_eq!(executions.len(), 2);
        assert_eq!(executions[0].exec_price, Price::new(101));
        assert_eq!(executions[0].exec_size, Quantity::new(3));
        assert_eq!(executions[1].exec_price, Price::new(102));
        assert_eq!(executions[1].exec_size, Quantity::new(4));
        assert_eq!(executions[1].taker_exec_type, ExecutionType::FullFill);

        let remaining = assert_some!(book.get_order(far));
        assert_eq!(remaining.shares(), Quantity::new(1));
    }

    #[test]
    fn self_trade_without_prior_fills_leaves_book_unchanged() {
        let mut book = book();
        let resting = rest(&mut book, 1, Side::Buy, 100, 5);

        let result = book.submit(intent(1, Side::Sell, 100, 3));
        assert_eq!(result, Err(SubmitError::SelfTradeRejected));

        assert!(book.drain_executions().is_empty());
        assert!(book.contains(resting));
        assert_eq!(book.best_bid(), Some(Price::new(100)));
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn self_trade_after_partial_cross_keeps_prior_executions() {
        let mut book = book();
        let other = rest(&mut book, 1, Side::Buy, 100, 2);
        let own = rest(&mut book, 2, Side::Buy, 100, 3);

        let result = book.submit(intent(2, Side::Sell, 100, 4));
        assert_eq!(result, Err(SubmitError::SelfTradeRejected));

        // the fill against client 1 stands; the residual was discarded
        let executions = book.drain_executions();
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].exec_price, Price::new(100));
        assert_eq!(executions[0].exec_size, Quantity::new(2));
        assert_eq!(executions[0].maker_order_id, other);

        assert!(!book.contains(other));
        assert!(book.contains(own));
        assert_eq!(book.best_ask(), None);
        assert_eq!(
            book.depth(Side::Buy, 10),
            vec![DepthLevel {
                price: Price::new(100),
                volume: Quantity::new(3),
                orders: 1,
            }]
        );
    }

    #[test]
    fn cancel_then_cancel_again() {
        let mut book = book();
        let id = rest(&mut book, 1, Side::Buy, 100, 10);

        assert_ok!(book.cancel(id));
        assert_eq!(book.best_bid(), None);
        assert!(!book.contains(id));

        assert_eq!(book.cancel(id), Err(CancelError::UnknownOrder(id)));
    }

    #[test]
    fn taker_average_price_is_volume_weighted() {
        let mut book = book();
        rest(&mut book, 1, Side::Sell, 101, 5);
        rest(&mut book, 2, Side::Sell, 103, 5);

        let outcome = assert_ok!(book.submit(intent(3, Side::Buy, 103, 10)));
        assert_eq!(outcome, SubmitOutcome::Filled);

        let executions = book.drain_executions();
        assert_eq!(executions.len(), 2);
        // after the first fill the taker has only traded at 101
        assert_eq!(executions[0].taker_avg_price, AvgPrice::from_ticks(101));
        assert_eq!(executions[0].taker_cum_qty, Quantity::new(5));
        // after the second, (5 * 101 + 5 * 103) / 10 = 102
        assert_eq!(executions[1].taker_avg_price, AvgPrice::from_ticks(102));
        assert_eq!(executions[1].taker_cum_qty, Quantity::new(10));
    }

    #[test]
    fn maker_average_price_spans_taker_and_maker_phases() {
        // client 1 takes 3 @ 101 on the way in, rests 4 @ 102, and is later
        // filled as a maker; its average covers all seven shares
        let mut book = book();
        rest(&mut book, 2, Side::Sell, 101, 3);
        let id = rest(&mut book, 1, Side::Buy, 102, 7);
        book.drain_executions();

        let outcome = assert_ok!(book.submit(intent(3, Side::Sell, 102, 4)));
        assert_eq!(outcome, SubmitOutcome::Filled);

        let executions = book.drain_executions();
        assert_eq!(executions.len(), 1);
        let execution = &executions[0];
        assert_eq!(execution.maker_order_id, id);
        assert_eq!(execution.maker_exec_type, ExecutionType::FullFill);
        assert_eq!(execution.maker_cum_qty, Quantity::new(7));
        assert_eq!(execution.maker_leaves_qty, Quantity::zero());
        // (3 * 101 + 4 * 102) / 7 at four decimal places, truncated
        assert_eq!(
            execution.maker_avg_price.get(),
            (3 * 101 + 4 * 102) * AvgPrice::SCALE / 7
        );
    }

    #[test]
    fn executed_quantity_is_conserved() {
        // every share drained from a resting order shows up exactly once as
        // execution size, on both sides
        let mut book = book();
        rest(&mut book, 1, Side::Sell, 101, 4);
        rest(&mut book, 2, Side::Sell, 101, 6);
        rest(&mut book, 3, Side::Sell, 103, 5);

        assert_ok!(book.submit(intent(4, Side::Buy, 102, 8)));
        assert_ok!(book.submit(intent(5, Side::Buy, 103, 10)));

        let executions = book.drain_executions();
        let total: u64 = executions.iter().map(|e| e.exec_size.get()).sum();
        // 15 shares were resting; 8 + 10 = 18 were demanded, limit-capped to
        // the 15 reachable, of which all were reachable at 103
        assert_eq!(total, 15);
        for execution in &executions {
            assert!(execution.maker_cum_qty >= execution.exec_size);
            assert!(execution.taker_cum_qty >= execution.exec_size);
        }
        // the second taker rests its residual: 18 - 15 = 3 at 103
        assert_eq!(
            book.depth(Side::Buy, 10),
            vec![DepthLevel {
                price: Price::new(103),
                volume: Quantity::new(3),
                orders: 1,
            }]
        );
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn book_is_never_crossed_at_rest() {
        let mut book = book();
        let submissions = [
            (1u64, Side::Buy, 100u64, 10u64),
            (2, Side::Sell, 105, 5),
            (3, Side::Buy, 104, 3),
            (4, Side::Sell, 104, 6),
            (5, Side::Buy, 106, 2),
            (6, Side::Sell, 99, 4),
        ];
        for (client, side, price, shares) in submissions {
            let _ = book.submit(intent(client, side, price, shares));
            if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
                assert!(bid < ask, "book crossed at rest: bid {bid:?} >= ask {ask:?}");
            }
        }
    }

    #[test]
    fn executions_keep_submission_order_across_drains() {
        let mut book = book();
        rest(&mut book, 1, Side::Sell, 100, 2);
        rest(&mut book, 2, Side::Sell, 100, 2);
        assert_ok!(book.submit(intent(3, Side::Buy, 100, 1)));
        assert_ok!(book.submit(intent(4, Side::Buy, 100, 3)));

        let executions = book.drain_executions();
        assert_eq!(executions.len(), 3);
        let ids: Vec<u64> = executions.iter().map(|e| e.execution_id.get()).collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted, "executions must drain in production order");
        assert!(book.drain_executions().is_empty());
    }
}
