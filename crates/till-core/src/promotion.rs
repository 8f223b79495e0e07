//! # Promotion Evaluator
//!
//! Pure functions that decide whether a promotion applies to a cart and how
//! much it takes off.
//!
//! ## Evaluation Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  calculate_discount(promotion, amount)                                  │
//! │                                                                         │
//! │  amount < minimum_purchase? ──yes──► 0 (silently inapplicable)          │
//! │         │ no                                                            │
//! │         ▼                                                               │
//! │  PERCENTAGE   ──► floor(amount × value / 100), capped at max_discount   │
//! │  FIXED_AMOUNT ──► value (may exceed amount)                             │
//! │  anything else ─► 0                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Two Naming Schemes
//! The backend serves promotions with localized keys (`maKhuyenMai`,
//! `giaTriGiam`, ...) on newer endpoints and English keys (`code`,
//! `discountValue`, ...) on older ones, sometimes both in the same object.
//! [`Promotion`] deserializes through [`RawPromotion`], which accepts either
//! spelling and merges them into one logical entity.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::PromotionError;
use crate::money::Money;
use crate::types::EntityId;

// =============================================================================
// Discount Type / Status
// =============================================================================

/// How a promotion's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountType {
    /// `value` is a percentage of the subtotal.
    Percentage,
    /// `value` is an amount in đồng.
    FixedAmount,
    /// Any type this client does not understand yields no discount.
    Unknown,
}

impl DiscountType {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "PERCENTAGE" | "PERCENT" | "PHAN_TRAM" => DiscountType::Percentage,
            "FIXED_AMOUNT" | "FIXED" | "SO_TIEN" | "TIEN_MAT" => DiscountType::FixedAmount,
            _ => DiscountType::Unknown,
        }
    }
}

/// Lifecycle status as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromotionStatus {
    Active,
    Inactive,
    Expired,
}

impl PromotionStatus {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "ACTIVE" | "HOAT_DONG" | "DANG_HOAT_DONG" => PromotionStatus::Active,
            "EXPIRED" | "HET_HAN" => PromotionStatus::Expired,
            _ => PromotionStatus::Inactive,
        }
    }
}

// =============================================================================
// Promotion
// =============================================================================

/// A discount rule with its eligibility constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawPromotion")]
pub struct Promotion {
    pub id: EntityId,
    pub code: String,
    pub name: String,
    pub discount_type: DiscountType,
    /// Percentage (e.g. `10`, `7.5`) or amount in đồng, per `discount_type`.
    pub discount_value: f64,
    pub minimum_purchase: Option<Money>,
    pub max_discount: Option<Money>,
    /// Global usage cap.
    pub usage_limit: Option<i64>,
    /// Cap per scope (branch) the list was fetched for.
    pub usage_limit_per_scope: Option<i64>,
    pub used_count: i64,
    pub end_date: Option<NaiveDateTime>,
    pub status: PromotionStatus,
}

/// Wire shape accepting both naming schemes.
///
/// Localized keys win when both are present.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPromotion {
    #[serde(default)]
    id: Option<EntityId>,

    #[serde(default)]
    ma_khuyen_mai: Option<String>,
    #[serde(default)]
    code: Option<String>,

    #[serde(default)]
    ten_khuyen_mai: Option<String>,
    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    loai_giam_gia: Option<String>,
    #[serde(default, alias = "type")]
    discount_type: Option<String>,

    #[serde(default)]
    gia_tri_giam: Option<f64>,
    #[serde(default)]
    discount_value: Option<f64>,

    #[serde(default)]
    gia_tri_don_hang_toi_thieu: Option<Money>,
    #[serde(default, alias = "minPurchaseAmount", alias = "minOrderAmount")]
    minimum_purchase: Option<Money>,

    #[serde(default)]
    giam_toi_da: Option<Money>,
    #[serde(default, alias = "maxDiscountAmount")]
    max_discount: Option<Money>,

    #[serde(default)]
    so_luong_toi_da: Option<i64>,
    #[serde(default)]
    usage_limit: Option<i64>,

    #[serde(default)]
    gioi_han_moi_chi_nhanh: Option<i64>,
    #[serde(default, alias = "branchUsageLimit")]
    usage_limit_per_scope: Option<i64>,

    #[serde(default)]
    so_luong_da_dung: Option<i64>,
    #[serde(default, alias = "usageCount")]
    used_count: Option<i64>,

    #[serde(default)]
    ngay_ket_thuc: Option<String>,
    #[serde(default)]
    end_date: Option<String>,

    #[serde(default)]
    trang_thai: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl From<RawPromotion> for Promotion {
    fn from(raw: RawPromotion) -> Self {
        let end_date = raw
            .ngay_ket_thuc
            .or(raw.end_date)
            .as_deref()
            .and_then(parse_end_date);

        Promotion {
            id: raw.id.unwrap_or_default(),
            code: raw.ma_khuyen_mai.or(raw.code).unwrap_or_default(),
            name: raw.ten_khuyen_mai.or(raw.name).unwrap_or_default(),
            discount_type: raw
                .loai_giam_gia
                .or(raw.discount_type)
                .as_deref()
                .map(DiscountType::parse)
                .unwrap_or(DiscountType::Unknown),
            discount_value: raw.gia_tri_giam.or(raw.discount_value).unwrap_or(0.0),
            minimum_purchase: raw.gia_tri_don_hang_toi_thieu.or(raw.minimum_purchase),
            max_discount: raw.giam_toi_da.or(raw.max_discount),
            usage_limit: raw.so_luong_toi_da.or(raw.usage_limit),
            usage_limit_per_scope: raw.gioi_han_moi_chi_nhanh.or(raw.usage_limit_per_scope),
            used_count: raw.so_luong_da_dung.or(raw.used_count).unwrap_or(0),
            end_date,
            status: raw
                .trang_thai
                .or(raw.status)
                .as_deref()
                .map(PromotionStatus::parse)
                .unwrap_or(PromotionStatus::Inactive),
        }
    }
}

/// Parses the end dates the backend emits.
///
/// A bare date means the promotion runs through the end of that day.
fn parse_end_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| NaiveTime::from_hms_opt(23, 59, 59).map(|t| d.and_time(t)))
}

impl Promotion {
    /// Whether the promotion's minimum purchase is met by `amount`.
    pub fn minimum_met(&self, amount: Money) -> bool {
        self.minimum_purchase.map_or(true, |min| amount >= min)
    }

    /// Whether the end date has passed at `now`.
    pub fn is_expired_at(&self, now: NaiveDateTime) -> bool {
        self.end_date.map_or(false, |end| end < now)
    }

    /// Whether usage is still under both the global and the scope cap.
    pub fn has_remaining_uses(&self) -> bool {
        let under = |limit: Option<i64>| limit.map_or(true, |l| self.used_count < l);
        under(self.usage_limit) && under(self.usage_limit_per_scope)
    }

    /// Full eligibility check used by the selectable list.
    pub fn is_eligible(&self, subtotal: Money, now: NaiveDateTime) -> bool {
        self.status == PromotionStatus::Active
            && self.minimum_met(subtotal)
            && !self.is_expired_at(now)
            && self.has_remaining_uses()
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Computes the discount a promotion grants on `amount`.
///
/// Pure and idempotent; the result is never negative.
///
/// ```rust
/// use till_core::money::Money;
/// use till_core::promotion::{calculate_discount, DiscountType, Promotion, PromotionStatus};
///
/// let ten_percent = Promotion {
///     id: 1,
///     code: "GIAM10".into(),
///     name: "Giảm 10%".into(),
///     discount_type: DiscountType::Percentage,
///     discount_value: 10.0,
///     minimum_purchase: None,
///     max_discount: None,
///     usage_limit: None,
///     usage_limit_per_scope: None,
///     used_count: 0,
///     end_date: None,
///     status: PromotionStatus::Active,
/// };
/// assert_eq!(calculate_discount(&ten_percent, Money::from_dong(50_000)).dong(), 5_000);
/// ```
pub fn calculate_discount(promotion: &Promotion, amount: Money) -> Money {
    if !promotion.minimum_met(amount) {
        return Money::zero();
    }

    let discount = match promotion.discount_type {
        DiscountType::Percentage => {
            let raw = amount.percent_floor(promotion.discount_value);
            // A cap of 0 is how the backend spells "uncapped"
            match promotion.max_discount {
                Some(cap) if cap.is_positive() => raw.min(cap),
                _ => raw,
            }
        }
        DiscountType::FixedAmount => {
            if promotion.discount_value.is_finite() {
                Money::from_dong(promotion.discount_value.floor() as i64)
            } else {
                Money::zero()
            }
        }
        DiscountType::Unknown => Money::zero(),
    };

    if discount.is_negative() {
        Money::zero()
    } else {
        discount
    }
}

/// Filters the server's list down to what the operator may select.
///
/// Ineligible promotions are removed entirely rather than shown disabled.
/// Server order is preserved.
pub fn available_promotions<'a>(
    all: &'a [Promotion],
    subtotal: Money,
    search_code: Option<&str>,
    now: NaiveDateTime,
) -> Vec<&'a Promotion> {
    let needle = search_code
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    all.iter()
        .filter(|p| p.is_eligible(subtotal, now))
        .filter(|p| {
            needle
                .as_ref()
                .map_or(true, |n| p.code.to_lowercase().contains(n.as_str()))
        })
        .collect()
}

/// Validates an operator's selection and returns the discount it grants.
///
/// A promotion that would take nothing off is rejected rather than applied
/// at zero value.
pub fn select_promotion(
    promotion: &Promotion,
    subtotal: Money,
    now: NaiveDateTime,
) -> Result<Money, PromotionError> {
    if !promotion.is_eligible(subtotal, now) {
        return Err(PromotionError::NotEligible {
            code: promotion.code.clone(),
        });
    }

    let discount = calculate_discount(promotion, subtotal);
    if discount.is_zero() {
        return Err(PromotionError::NoBenefit {
            code: promotion.code.clone(),
        });
    }

    Ok(discount)
}

// =============================================================================
// Unit Tests
// =============================================================================
