use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::cart::OrderSummary;
use super::checkout::{BuyerKind, CheckoutFormData};
use super::payment::Transaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Mpesa,
    GroupCredit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    pub buyer_type: BuyerKind,
    pub full_name: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_officer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<&CheckoutFormData> for CustomerInfo {
    fn from(form: &CheckoutFormData) -> Self {
        Self {
            buyer_type: form.buyer_kind,
            full_name: form.full_name.trim().to_string(),
            phone: form.phone.trim().to_string(),
            email: form.email.clone(),
            address: form.address.trim().to_string(),
            city: form.city.clone(),
            client_id: form.client_id,
            group_id: form.group_id,
            branch_id: form.branch_id,
            credit_officer: form.credit_officer.clone(),
            notes: form.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: i64,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Receipt details copied from the settled M-Pesa transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub checkout_request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mpesa_receipt_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_date: Option<String>,
}

impl PaymentReceipt {
    pub fn from_transaction(checkout_request_id: &str, tx: &Transaction) -> Self {
        Self {
            checkout_request_id: checkout_request_id.to_string(),
            mpesa_receipt_number: tx.mpesa_receipt_number.clone(),
            amount: tx.amount_text(),
            phone_number: tx.phone_text(),
            transaction_date: tx.date_text(),
        }
    }
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSubmission {
    pub customer: CustomerInfo,
    pub items: Vec<OrderItemRequest>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total_amount: Decimal,
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentReceipt>,
}

impl OrderSubmission {
    pub fn build(
        form: &CheckoutFormData,
        summary: &OrderSummary,
        payment: Option<PaymentReceipt>,
    ) -> Self {
        let payment_method = match (form.buyer_kind, &payment) {
            (_, Some(_)) => PaymentMethod::Mpesa,
            (BuyerKind::Group, None) => PaymentMethod::GroupCredit,
            (BuyerKind::Individual, None) => PaymentMethod::Mpesa,
        };

        Self {
            customer: CustomerInfo::from(form),
            items: summary
                .items
                .iter()
                .map(|line| OrderItemRequest {
                    product_id: line.item_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
            subtotal: summary.subtotal,
            shipping: summary.shipping,
            tax: summary.tax,
            total_amount: summary.total,
            payment_method,
            payment,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub product_name: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "total")]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// Lifecycle stages shown on the order-tracking timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum OrderStage {
    Placed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStage {
    pub fn parse(status: &str) -> Option<Self> {
        match status.trim().to_ascii_uppercase().as_str() {
            "PENDING" | "PLACED" | "NEW" => Some(OrderStage::Placed),
            "PROCESSING" | "CONFIRMED" | "PAID" => Some(OrderStage::Processing),
            "SHIPPED" | "DISPATCHED" | "IN_TRANSIT" => Some(OrderStage::Shipped),
            "DELIVERED" | "COMPLETED" => Some(OrderStage::Delivered),
            "CANCELLED" | "CANCELED" | "REJECTED" => Some(OrderStage::Cancelled),
            _ => None,
        }
    }
}

impl Order {
    pub fn stage(&self) -> Option<OrderStage> {
        self.status.as_deref().and_then(OrderStage::parse)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusUpdate {
    pub status: String,
}
