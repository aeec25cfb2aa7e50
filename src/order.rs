use serde::{Deserialize, Serialize};

/// The id assigned to an order when it rests on the book.
///
/// Ids are issued by the [`Sequencer`](crate::sequencer::Sequencer) and are
/// strictly monotonic within a process.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(u64);

impl OrderId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// The id assigned to an execution record.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(u64);

impl ExecutionId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// An opaque id identifying the client that submitted an order.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(u64);

impl ClientId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

/// A limit price in integer ticks.
///
/// Prices are plain integers so that comparisons and the volume-weighted
/// average calculations never touch floating point. A price of zero is not a
/// valid limit price; [`Book::submit`](crate::book::Book::submit) rejects it.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Price(u64);

impl Price {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// A whole-share quantity.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Quantity(u64);

impl Quantity {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

/// A volume-weighted average fill price.
///
/// Stored as a fixed-point value with [`AvgPrice::SCALE`] sub-tick digits and
/// always derived from the exact `(executed notional, executed quantity)`
/// pair an order carries, never from a previously rounded average.
///
/// # Examples
/// ```
/// use matchbook::order::AvgPrice;
/// // 5 shares at 101 and 5 shares at 103 average to 102 exactly.
/// let avg = AvgPrice::from_ratio(5 * 101 + 5 * 103, 10);
/// assert_eq!(avg, AvgPrice::from_ticks(102));
/// ```
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AvgPrice(u64);

impl AvgPrice {
    /// Fixed-point denominator: four decimal digits of sub-tick precision.
    pub const SCALE: u64 = 10_000;

    pub fn zero() -> Self {
        Self(0)
    }

    /// Derives the average from a notional/quantity pair.
    ///
    /// Returns zero when `quantity` is zero (an order that has not executed).
    /// Saturates at the maximum representable value.
    pub fn from_ratio(notional: u128, quantity: u64) -> Self {
        if quantity == 0 {
            return Self(0);
        }
        let scaled = notional.saturating_mul(u128::from(Self::SCALE)) / u128::from(quantity);
        Self(u64::try_from(scaled).unwrap_or(u64::MAX))
    }

    /// An average sitting exactly on a whole tick.
    pub fn from_ticks(ticks: u64) -> Self {
        Self(ticks.saturating_mul(Self::SCALE))
    }

    /// The raw fixed-point value, in `1 / SCALE` ticks.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// The symbol an engine instance trades.
///
/// Up to eight ASCII alphanumeric characters, stored inline so that every
/// [`Execution`](crate::execution::Execution) can carry it by copy.
#[derive(Clone, Copy, Hash, PartialEq, Eq)]
pub struct Symbol {
    bytes: [u8; Self::MAX_LEN],
    len: u8,
}

impl Symbol {
    pub const MAX_LEN: usize = 8;

    /// Parses a symbol from a string.
    ///
    /// Returns `None` if the string is empty, longer than [`Self::MAX_LEN`],
    /// or contains anything but ASCII alphanumerics.
    pub fn try_from_str(value: &str) -> Option<Self> {
        if value.is_empty() || value.len() > Self::MAX_LEN {
            return None;
        }
        if !value.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return None;
        }
        let mut bytes = [0u8; Self::MAX_LEN];
        bytes[..value.len()].copy_from_slice(value.as_bytes());
        Some(Self {
            bytes,
            len: value.len() as u8,
        })
    }

    pub fn as_str(&self) -> &str {
        // only constructed from validated ASCII
        std::str::from_utf8(&self.bytes[..usize::from(self.len)]).unwrap_or_default()
    }
}

impl std::fmt::Debug for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Symbol").field(&self.as_str()).finish()
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Symbol {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Symbol::try_from_str(&value).ok_or_else(|| {
            serde::de::Error::custom("symbol must be 1-8 ASCII alphanumeric characters")
        })
    }
}

/// The side of an order.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl Side {
    pub fn is_buy(self) -> bool {
        self == Self::Buy
    }

    pub fn is_sell(self) -> bool {
        self == Self::Sell
    }

    /// Returns the opposite of `self`.
    ///
    /// # Examples
    /// ```
    /// use matchbook::order::Side;
    /// assert_eq!(Side::Buy.opposite(), Side::Sell);
    /// assert_eq!(Side::Sell.opposite(), Side::Buy);
    /// ```
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// An order intent as submitted by a session.
///
/// The matcher consumes the intent in place: `shares` counts down as fills
/// are produced, and the executed-quantity/notional pair accumulates so that
/// the running average fill price can be derived at any point. An intent with
/// residual shares after matching becomes a resting [`Order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderData {
    pub(crate) client_id: ClientId,
    pub(crate) side: Side,
    pub(crate) limit_price: Price,
    pub(crate) shares: Quantity,
    #[serde(default = "Quantity::zero")]
    pub(crate) executed_quantity: Quantity,
    #[serde(default)]
    pub(crate) executed_notional: u128,
}

impl OrderData {
    pub fn new(client_id: ClientId, side: Side, limit_price: Price, shares: Quantity) -> Self {
        Self {
            client_id,
            side,
            limit_price,
            shares,
            executed_quantity: Quantity::zero(),
            executed_notional: 0,
        }
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn limit_price(&self) -> Price {
        self.limit_price
    }

    pub fn shares(&self) -> Quantity {
        self.shares
    }

    pub fn executed_quantity(&self) -> Quantity {
        self.executed_quantity
    }

    /// The running volume-weighted average fill price of this intent.
    pub fn avg_price(&self) -> AvgPrice {
        AvgPrice::from_ratio(self.executed_notional, self.executed_quantity.get())
    }

    pub fn is_filled(&self) -> bool {
        self.shares.is_zero()
    }

    /// Applies a fill of `volume` shares at `price`.
    pub(crate) fn fill(&mut self, price: Price, volume: Quantity) {
        debug_assert!(volume <= self.shares);
        self.shares = self.shares.saturating_sub(volume);
        self.executed_quantity = self.executed_quantity.saturating_add(volume);
        self.executed_notional += u128::from(price.get()) * u128::from(volume.get());
    }
}

/// An order resting on the book.
///
/// Created from the residual of an [`OrderData`] that did not fully match,
/// keeping the execution state the intent accumulated on the way in. Which
/// [`Limit`](crate::level::Limit) owns the order is tracked by the book's
/// order index, keyed by `(side, limit_price)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub(crate) id: OrderId,
    pub(crate) client_id: ClientId,
    pub(crate) side: Side,
    pub(crate) limit_price: Price,
    pub(crate) shares: Quantity,
    pub(crate) executed_quantity: Quantity,
    pub(crate) executed_notional: u128,
}

impl Order {
    pub(crate) fn from_intent(id: OrderId, intent: &OrderData) -> Self {
        Self {
            id,
            client_id: intent.client_id,
            side: intent.side,
            limit_price: intent.limit_price,
            shares: intent.shares,
            executed_quantity: intent.executed_quantity,
            executed_notional: intent.executed_notional,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn limit_price(&self) -> Price {
        self.limit_price
    }

    /// Remaining unfilled shares.
    pub fn shares(&self) -> Quantity {
        self.shares
    }

    pub fn executed_quantity(&self) -> Quantity {
        self.executed_quantity
    }

    pub fn avg_price(&self) -> AvgPrice {
        AvgPrice::from_ratio(self.executed_notional, self.executed_quantity.get())
    }

    /// Returns if the order still provides volume.
    ///
    /// Orders with zero shares are holes in their level's backing storage and
    /// are skipped by iteration until compaction reclaims them.
    pub(crate) fn has_volume(&self) -> bool {
        !self.shares.is_zero()
    }

    pub(crate) fn fill(&mut self, price: Price, volume: Quantity) {
        debug_assert!(volume <= self.shares);
        self.shares = self.shares.saturating_sub(volume);
        self.executed_quantity = self.executed_quantity.saturating_add(volume);
        self.executed_notional += u128::from(price.get()) * u128::from(volume.get());
    }
}
