use crate::client::{MwanamamaClient, encode_path_segment};
use crate::error::MwanamamaError;
use crate::model::order::{Order, OrderStatusUpdate, OrderSubmission};

impl MwanamamaClient {
    /// Submit an order.
    ///
    /// POST /orders
    pub async fn place_order(&self, order: &OrderSubmission) -> Result<Order, MwanamamaError> {
        self.post("/orders", order).await
    }

    /// All orders (back office).
    ///
    /// GET /orders
    pub async fn list_orders(&self) -> Result<Vec<Order>, MwanamamaError> {
        self.get_list("/orders").await
    }

    /// Orders belonging to the signed-in customer.
    ///
    /// GET /orders/my-orders
    pub async fn my_orders(&self) -> Result<Vec<Order>, MwanamamaError> {
        self.get_list("/orders/my-orders").await
    }

    /// GET /orders/{id}
    pub async fn get_order(&self, id: i64) -> Result<Order, MwanamamaError> {
        self.get(&format!("/orders/{id}")).await
    }

    /// Look an order up by its public order number, for the tracking page.
    ///
    /// GET /orders/track/{order_number}
    pub async fn track_order(&self, order_number: &str) -> Result<Order, MwanamamaError> {
        let path = format!("/orders/track/{}", encode_path_segment(order_number.trim()));
        self.get(&path).await
    }

    /// PUT /orders/{id}/status
    pub async fn update_order_status(&self, id: i64, status: &str) -> Result<Order, MwanamamaError> {
        let body = OrderStatusUpdate {
            status: status.to_string(),
        };
        self.put(&format!("/orders/{id}/status"), &body).await
    }

    /// DELETE /orders/{id}
    pub async fn delete_order(&self, id: i64) -> Result<(), MwanamamaError> {
        self.delete(&format!("/orders/{id}")).await
    }
}
