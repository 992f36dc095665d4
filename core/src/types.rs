//! Response records for the grocery API.
//!
//! # Design
//! Field names follow Rust conventions and map onto the service's PascalCase
//! keys through serde. Every struct is `#[serde(default)]`: a key the server
//! leaves out decodes as the zero value, and keys nobody asked for are
//! ignored. The mock server defines its own copies of these shapes; the
//! integration tests catch drift between the two.
//!
//! Nutrient and ingredient counts are not stored. The server sends them next
//! to the arrays they count; use `len()` on the arrays instead.

use serde::{Deserialize, Serialize};

/// Status carried by every response. Zero means success.
pub trait Status {
    fn status_code(&self) -> i32;
    fn status_info(&self) -> &str;
}

macro_rules! impl_status {
    ($($ty:ty),+) => {
        $(impl Status for $ty {
            fn status_code(&self) -> i32 {
                self.status_code
            }

            fn status_info(&self) -> &str {
                &self.status_info
            }
        })+
    };
}

impl_status!(LoginResult, SearchResult, ChangeBasketResult, BasketListing);

/// Result of `LOGIN`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct LoginResult {
    pub status_code: i32,
    pub status_info: String,
    pub branch_number: String,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_forename: String,
    pub session_key: String,
    #[serde(rename = "InAmendOrderMode", alias = "InAmmendOrderMode")]
    pub in_amend_order_mode: String,
    pub chosen_delivery_slot_info: String,
}

/// Result of `PRODUCTSEARCH`: one page of matching products.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct SearchResult {
    pub status_code: i32,
    pub status_info: String,
    pub page_number: u32,
    pub total_page_count: u32,
    pub total_product_count: u32,
    pub page_product_count: u32,
    pub products: Vec<Product>,
}

/// A catalog entry.
///
/// Nutrients, ingredients and the longer descriptive fields are only filled
/// in by extended searches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Product {
    pub base_product_id: String,
    #[serde(rename = "EANBarcode")]
    pub ean_barcode: String,
    pub cheaper_alternative_product_id: String,
    pub cooking_and_usage: String,
    pub extended_description: String,
    pub healthier_alternative_product_id: String,
    pub image_path: String,
    pub maximum_purchase_quantity: i32,
    pub name: String,
    pub offer_promotion: String,
    pub offer_validity: String,
    pub offer_label_image_path: String,
    pub price: f64,
    pub price_description: String,
    pub product_id: String,
    pub product_type: String,
    pub rating: i32,
    pub storage_info: String,
    pub unit_price: f64,
    pub unit_type: String,
    #[serde(rename = "RDA_Calories_Count")]
    pub rda_calories_count: String,
    #[serde(rename = "RDA_Calories_Percent")]
    pub rda_calories_percent: String,
    #[serde(rename = "RDA_Sugar_Grammes")]
    pub rda_sugar_grammes: String,
    #[serde(rename = "RDA_Sugar_Percent")]
    pub rda_sugar_percent: String,
    #[serde(rename = "RDA_Fat_Grammes")]
    pub rda_fat_grammes: String,
    #[serde(rename = "RDA_Fat_Percent")]
    pub rda_fat_percent: String,
    #[serde(rename = "RDA_Saturates_Grammes")]
    pub rda_saturates_grammes: String,
    #[serde(rename = "RDA_Saturates_Percent")]
    pub rda_saturates_percent: String,
    #[serde(rename = "RDA_Salt_Grammes")]
    pub rda_salt_grammes: String,
    #[serde(rename = "RDA_Salt_Percent")]
    pub rda_salt_percent: String,
    pub nutrients: Vec<Nutrient>,
    pub ingredients: Vec<Ingredient>,
}

impl Product {
    pub fn nutrients_count(&self) -> usize {
        self.nutrients.len()
    }

    pub fn ingredients_count(&self) -> usize {
        self.ingredients.len()
    }
}

/// One row of a nutrition table. Values are free text as sent by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Nutrient {
    pub nutrient_name: String,
    pub sample_description: String,
    pub sample_size: String,
    pub serving_description: String,
    pub serving_size: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Ingredient {
    pub name: String,
}

/// Result of `CHANGEBASKET`. The basket itself is not returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ChangeBasketResult {
    pub status_code: i32,
    pub status_info: String,
}

/// Result of `LISTBASKET`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct BasketListing {
    pub status_code: i32,
    pub status_info: String,
    #[serde(rename = "BasketID")]
    pub basket_id: String,
    pub in_amend_order_mode: String,
    pub basket_guide_multi_buy_savings: String,
    pub basket_guide_price: String,
    pub basket_quantity: String,
    pub basket_total_clubcard_points: String,
    pub basket_lines: Vec<BasketLine>,
}

/// A product in the basket together with its line-level totals.
///
/// In fast listings some catalog attributes, such as the barcode, may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct BasketLine {
    pub basket_line_error_message: String,
    pub basket_line_guide_price: String,
    pub basket_line_promo_message: String,
    pub basket_line_quantity: String,
    pub base_product_id: String,
    #[serde(rename = "EANBarcode")]
    pub ean_barcode: String,
    pub image_path: String,
    pub maximum_purchase_quantity: i32,
    pub name: String,
    pub offer_promotion: String,
    pub offer_validity: String,
    pub price: f64,
    pub price_description: String,
    pub product_id: String,
    pub product_type: String,
    pub storage_info: String,
    pub unit_price: f64,
    pub unit_type: String,
    pub note_for_personal_shopper: String,
    pub substitution_note: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_result_reads_pascal_case_keys() {
        let result: LoginResult = serde_json::from_str(
            r#"{"StatusCode":0,"StatusInfo":"Command Processed OK","BranchNumber":"2431",
                "CustomerId":"123","CustomerName":"Mr Shopper","CustomerForename":"Sam",
                "SessionKey":"abc","InAmendOrderMode":"N","ChosenDeliverySlotInfo":"No slot"}"#,
        )
        .unwrap();
        assert_eq!(result.session_key, "abc");
        assert_eq!(result.customer_forename, "Sam");
        assert_eq!(result.branch_number, "2431");
        assert_eq!(result.in_amend_order_mode, "N");
    }

    #[test]
    fn login_result_accepts_misspelled_amend_key() {
        let result: LoginResult = serde_json::from_str(r#"{"InAmmendOrderMode":"Y"}"#).unwrap();
        assert_eq!(result.in_amend_order_mode, "Y");
    }

    #[test]
    fn missing_fields_default_and_unknown_fields_are_ignored() {
        let result: SearchResult =
            serde_json::from_str(r#"{"StatusCode":0,"SomethingNew":[1,2,3]}"#).unwrap();
        assert_eq!(result.status_code, 0);
        assert_eq!(result.page_number, 0);
        assert!(result.products.is_empty());
    }

    #[test]
    fn product_reads_irregular_keys() {
        let product: Product = serde_json::from_str(
            r#"{"ProductId":"254656543","EANBarcode":"5000169005071","Price":1.1,
                "RDA_Salt_Grammes":"0.1g","RDA_Calories_Percent":"4%",
                "NutrientsCount":1,"Nutrients":[{"NutrientName":"Energy","SampleSize":"100ml"}],
                "IngredientsCount":2,"Ingredients":[{"Name":"Milk"},{"Name":"Vitamin D"}]}"#,
        )
        .unwrap();
        assert_eq!(product.ean_barcode, "5000169005071");
        assert_eq!(product.rda_salt_grammes, "0.1g");
        assert_eq!(product.rda_calories_percent, "4%");
        assert_eq!(product.nutrients_count(), 1);
        assert_eq!(product.nutrients[0].nutrient_name, "Energy");
        assert_eq!(product.ingredients_count(), 2);
        assert_eq!(product.ingredients[1].name, "Vitamin D");
    }

    #[test]
    fn basket_listing_reads_basket_id() {
        let listing: BasketListing = serde_json::from_str(
            r#"{"StatusCode":0,"BasketID":"777","BasketQuantity":"5",
                "BasketLines":[{"ProductId":"1","BasketLineQuantity":"5","SubstitutionNote":"any"}]}"#,
        )
        .unwrap();
        assert_eq!(listing.basket_id, "777");
        assert_eq!(listing.basket_lines.len(), 1);
        assert_eq!(listing.basket_lines[0].basket_line_quantity, "5");
        assert_eq!(listing.basket_lines[0].substitution_note, "any");
    }

    #[test]
    fn status_trait_reports_code_and_info() {
        let result = ChangeBasketResult {
            status_code: 200,
            status_info: "Product not found".to_string(),
        };
        assert_eq!(result.status_code(), 200);
        assert_eq!(result.status_info(), "Product not found");
    }
}
