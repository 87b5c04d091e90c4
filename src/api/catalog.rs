use crate::client::{MwanamamaClient, encode_path_segment};
use crate::error::MwanamamaError;
use crate::model::catalog::*;

impl MwanamamaClient {
    /// GET /categories
    pub async fn list_categories(&self) -> Result<Vec<Category>, MwanamamaError> {
        self.get_list("/categories").await
    }

    /// Categories arranged parent → children.
    pub async fn category_tree(&self) -> Result<Vec<CategoryNode>, MwanamamaError> {
        let flat = self.list_categories().await?;
        Ok(CategoryNode::build_tree(&flat))
    }

    /// POST /categories
    pub async fn create_category(&self, input: &CategoryInput) -> Result<Category, MwanamamaError> {
        self.post("/categories", input).await
    }

    /// PUT /categories/{id}
    pub async fn update_category(
        &self,
        id: i64,
        input: &CategoryInput,
    ) -> Result<Category, MwanamamaError> {
        self.put(&format!("/categories/{id}"), input).await
    }

    /// DELETE /categories/{id}
    pub async fn delete_category(&self, id: i64) -> Result<(), MwanamamaError> {
        self.delete(&format!("/categories/{id}")).await
    }

    /// GET /products
    pub async fn list_products(&self) -> Result<Vec<Product>, MwanamamaError> {
        self.get_list("/products").await
    }

    /// GET /products/category/{category_id}
    pub async fn products_in_category(
        &self,
        category_id: i64,
    ) -> Result<Vec<Product>, MwanamamaError> {
        self.get_list(&format!("/products/category/{category_id}")).await
    }

    /// GET /products/search?query={query}
    pub async fn search_products(&self, query: &str) -> Result<Vec<Product>, MwanamamaError> {
        let path = format!("/products/search?query={}", encode_path_segment(query.trim()));
        self.get_list(&path).await
    }

    /// GET /products/{id}
    pub async fn get_product(&self, id: i64) -> Result<Product, MwanamamaError> {
        self.get(&format!("/products/{id}")).await
    }

    /// POST /products
    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, MwanamamaError> {
        self.post("/products", input).await
    }

    /// PUT /products/{id}
    pub async fn update_product(
        &self,
        id: i64,
        input: &ProductInput,
    ) -> Result<Product, MwanamamaError> {
        self.put(&format!("/products/{id}"), input).await
    }

    /// DELETE /products/{id}
    pub async fn delete_product(&self, id: i64) -> Result<(), MwanamamaError> {
        self.delete(&format!("/products/{id}")).await
    }

    /// GET /branches
    pub async fn list_branches(&self) -> Result<Vec<Branch>, MwanamamaError> {
        self.get_list("/branches").await
    }

    /// GET /groups
    pub async fn list_groups(&self) -> Result<Vec<Group>, MwanamamaError> {
        self.get_list("/groups").await
    }

    /// GET /groups/branch/{branch_id}
    pub async fn groups_in_branch(&self, branch_id: i64) -> Result<Vec<Group>, MwanamamaError> {
        self.get_list(&format!("/groups/branch/{branch_id}")).await
    }

    /// GET /groups/{group_id}/clients
    pub async fn group_clients(&self, group_id: i64) -> Result<Vec<Client>, MwanamamaError> {
        self.get_list(&format!("/groups/{group_id}/clients")).await
    }

    /// GET /addresses
    pub async fn list_addresses(&self) -> Result<Vec<Address>, MwanamamaError> {
        self.get_list("/addresses").await
    }

    /// POST /addresses
    pub async fn add_address(&self, address: &Address) -> Result<Address, MwanamamaError> {
        self.post("/addresses", address).await
    }

    /// GET /users
    pub async fn list_users(&self) -> Result<Vec<User>, MwanamamaError> {
        self.get_list("/users").await
    }

    /// GET /roles
    pub async fn list_roles(&self) -> Result<Vec<Role>, MwanamamaError> {
        self.get_list("/roles").await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::auth::Anonymous;
    use crate::config::ClientConfig;

    fn client_for(server: &MockServer) -> MwanamamaClient {
        let config = ClientConfig::builder().base_url(server.uri()).build().unwrap();
        MwanamamaClient::new(config, Arc::new(Anonymous)).unwrap()
    }

    #[tokio::test]
    async fn test_category_tree_from_data_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"id": 1, "name": "Food"},
                    {"id": 2, "name": "Flour", "parentId": 1},
                    {"id": 3, "name": "Household"}
                ]
            })))
            .mount(&server)
            .await;

        let tree = client_for(&server).category_tree().await.unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].children[0].category.name, "Flour");
    }

    #[tokio::test]
    async fn test_search_products_bare_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/search"))
            .and(query_param("query", "unga ya ngano"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 4, "name": "Unga ya ngano 2kg", "price": 210}
            ])))
            .mount(&server)
            .await;

        let products = client_for(&server).search_products(" unga ya ngano ").await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].price, dec!(210));
    }

    #[tokio::test]
    async fn test_delete_product_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/products/4"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let err = client_for(&server).delete_product(4).await.unwrap_err();
        assert!(matches!(err, MwanamamaError::Api { status: 403, .. }));
    }
}
