//! # Domain Types
//!
//! Core domain types shared by the cart, the promotion evaluator and the
//! API layer.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Customer     │   │    Invoice      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  id / code      │       │
//! │  │  name           │   │  name, phone    │   │  status         │       │
//! │  │  price          │   │  points         │   │  totals, lines  │       │
//! │  │  stock          │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │   OrderType     │   │  InvoiceStatus  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  DineIn         │   │  Pending        │       │
//! │  │  1000 = 10%     │   │  Takeaway       │   │  Completed      │       │
//! │  └─────────────────┘   │  Delivery       │   │  Cancelled      │       │
//! │                        └─────────────────┘   │  Refunded       │       │
//! │                                              └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Promotions live in [`crate::promotion`] because of their dual naming
//! scheme on the wire.
//!
//! ## Identity
//! The backend uses numeric ids for every entity. Invoices also carry a
//! human-readable `code` (e.g. `HD000123`) that is what operators read aloud.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::promotion::Promotion;

/// Backend entity identifier.
pub type EntityId = i64;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1000 bps = 10% (standard Vietnamese VAT)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::from_bps(crate::DEFAULT_TAX_RATE_BPS)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A catalog entry as the register sees it.
///
/// The catalog itself is managed elsewhere; the cart only needs enough to
/// display a line and price it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Backend product id.
    pub id: EntityId,

    /// Display name shown to the cashier and on the receipt.
    #[serde(alias = "tenSanPham")]
    pub name: String,

    /// Unit price in đồng.
    #[serde(alias = "giaBan")]
    pub price: Money,

    /// Stock on hand, when the backend tracks it.
    #[serde(default, alias = "soLuongTon")]
    pub stock: Option<i64>,

    /// Product image.
    #[serde(default, alias = "hinhAnh")]
    pub image_url: Option<String>,
}

impl Product {
    /// Creates a product reference with no stock information.
    pub fn new(id: EntityId, name: impl Into<String>, price: Money) -> Self {
        Product {
            id,
            name: name.into(),
            price,
            stock: None,
            image_url: None,
        }
    }

    /// Checks whether stock allows selling `quantity` units.
    ///
    /// The cart never calls this; the product grid does before adding.
    /// Untracked stock (`None`) always allows the sale.
    pub fn can_sell(&self, quantity: i64) -> bool {
        match self.stock {
            Some(stock) => stock >= quantity,
            None => true,
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A loyalty customer attached to the order. Absence means walk-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: EntityId,
    #[serde(alias = "hoTen", alias = "tenKhachHang")]
    pub name: String,
    #[serde(default, alias = "soDienThoai")]
    pub phone: Option<String>,
    /// Accrued loyalty points (server-computed).
    #[serde(default, alias = "diemTichLuy")]
    pub points: i64,
}

// =============================================================================
// Order Type
// =============================================================================

/// How the order leaves the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Served at a table (a table is usually selected).
    #[default]
    DineIn,
    Takeaway,
    Delivery,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::DineIn => write!(f, "dine-in"),
            OrderType::Takeaway => write!(f, "takeaway"),
            OrderType::Delivery => write!(f, "delivery"),
        }
    }
}

impl std::str::FromStr for OrderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', ' '], "-").as_str() {
            "dine-in" | "dinein" | "tai-cho" => Ok(OrderType::DineIn),
            "takeaway" | "take-away" | "mang-ve" => Ok(OrderType::Takeaway),
            "delivery" | "giao-hang" => Ok(OrderType::Delivery),
            _ => Err(format!("Unknown order type: {}", s)),
        }
    }
}

// =============================================================================
// Invoice Status
// =============================================================================

/// Server-side lifecycle of an invoice.
///
/// ```text
///   hold ──► PENDING ──complete──► COMPLETED ──refund──► REFUNDED
///               │
///               └──cancel-pending──► CANCELLED
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    #[serde(alias = "CHO_THANH_TOAN")]
    Pending,
    #[serde(alias = "DA_THANH_TOAN", alias = "HOAN_THANH")]
    Completed,
    #[serde(alias = "DA_HUY")]
    Cancelled,
    #[serde(alias = "HOAN_TRA")]
    Refunded,
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::Completed => "COMPLETED",
            InvoiceStatus::Cancelled => "CANCELLED",
            InvoiceStatus::Refunded => "REFUNDED",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A line of a server invoice (snapshot at the time it was written).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    #[serde(alias = "sanPhamId")]
    pub product_id: EntityId,
    #[serde(default, alias = "tenSanPham")]
    pub product_name: String,
    #[serde(alias = "donGia")]
    pub unit_price: Money,
    #[serde(alias = "soLuong")]
    pub quantity: i64,
    #[serde(default, alias = "ghiChu")]
    pub note: Option<String>,
    /// Product image, when the backend joins it in.
    #[serde(default, alias = "hinhAnh")]
    pub image_url: Option<String>,
}

/// An invoice as returned by the backend.
///
/// ## Authority
/// Every amount here is computed by the server. The register displays these
/// values and bills against `total`; it never recomputes points or totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: EntityId,

    /// Human-readable invoice code.
    #[serde(default, alias = "maHoaDon")]
    pub code: String,

    #[serde(alias = "trangThai")]
    pub status: InvoiceStatus,

    #[serde(default, alias = "tongTienHang")]
    pub subtotal: Money,

    #[serde(default, alias = "tienGiamGia")]
    pub discount: Money,

    /// Net amount the customer owes.
    #[serde(default, alias = "tongThanhToan", alias = "tongTien")]
    pub total: Money,

    /// Loyalty points accrued by this invoice.
    #[serde(default, alias = "diemTichLuy")]
    pub points_earned: i64,

    #[serde(default, alias = "chiTietHoaDon", alias = "items")]
    pub lines: Vec<InvoiceLine>,

    #[serde(default, alias = "khachHang")]
    pub customer: Option<Customer>,

    #[serde(default, alias = "khuyenMai")]
    pub promotion: Option<Promotion>,

    #[serde(default, alias = "ban")]
    pub table: Option<String>,

    #[serde(default, alias = "loaiDonHang")]
    pub order_type: Option<OrderType>,

    /// Operator note recorded when the bill was held.
    #[serde(default, alias = "ghiChu")]
    pub note: Option<String>,
}

impl Invoice {
    /// Whether this invoice is a held bill that can still be edited.
    pub fn is_pending(&self) -> bool {
        self.status == InvoiceStatus::Pending
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
