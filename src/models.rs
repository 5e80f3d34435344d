use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// The closed set of roles an account can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Retailer,
    Wholesaler,
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRoleError(pub String);

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Retailer => "retailer",
            Role::Wholesaler => "wholesaler",
            Role::Admin => "admin",
        }
    }

    /// Where a freshly authenticated account lands.
    pub fn destination(&self) -> Destination {
        match self {
            Role::Retailer => Destination::RetailerDashboard,
            Role::Wholesaler => Destination::WholesalerDashboard,
            Role::Admin => Destination::AdminDashboard,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retailer" => Ok(Role::Retailer),
            "wholesaler" => Ok(Role::Wholesaler),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRoleError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    RetailerDashboard,
    WholesalerDashboard,
    AdminDashboard,
}

impl Destination {
    pub fn path(&self) -> &'static str {
        match self {
            Destination::RetailerDashboard => "/dashboard/retailer",
            Destination::WholesalerDashboard => "/dashboard/wholesaler",
            Destination::AdminDashboard => "/dashboard/admin",
        }
    }
}

/// Routes a raw role value. Anything outside [`Role`] is an error rather than
/// a silent no-op.
pub fn route_for_role(raw: &str) -> Result<Destination, UnknownRoleError> {
    raw.parse::<Role>().map(|role| role.destination())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserAccount {
    pub id: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("price is empty")]
    Empty,

    #[error("price `{0}` is not a number")]
    Malformed(String),

    #[error("price `{0}` is negative")]
    Negative(String),
}

/// Most fractional digits a price may carry.
pub const MAX_PRICE_SCALE: usize = 28;

/// A non-negative decimal amount. Carried as text on the wire and in stored
/// documents; anything that does not parse is rejected on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Price(Decimal);

impl Price {
    pub fn parse(raw: &str) -> Result<Self, PriceError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PriceError::Empty);
        }
        let malformed = || PriceError::Malformed(raw.to_string());

        // plain digits with an optional fraction; no separators or exponents
        let unsigned = raw.strip_prefix('-').unwrap_or(raw);
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let digits_only = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty())
            || !digits_only(whole)
            || !digits_only(fraction)
            || fraction.len() > MAX_PRICE_SCALE
        {
            return Err(malformed());
        }

        let amount = Decimal::from_str(raw).map_err(|_| malformed())?;
        // the parser rounds when the digits do not fit
        if amount.scale() as usize != fraction.len() {
            return Err(malformed());
        }
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative(raw.to_string()));
        }
        Ok(Self(amount))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<String> for Price {
    type Error = PriceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Price::parse(&value)
    }
}

impl From<Price> for String {
    fn from(price: Price) -> Self {
        price.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    #[schema(value_type = String, example = "50.5")]
    pub price: Price,
    pub image: String,
    pub wholesaler_id: String,
}

/// Formats an amount with two decimals, the way totals are shown to buyers.
pub fn format_amount(amount: Decimal) -> String {
    format!("{:.2}", amount)
}
