//! In-memory stand-in for the grocery REST service.
//!
//! Serves `GET /restservice.aspx` and dispatches on the `COMMAND` query
//! parameter. It keeps the upstream service's bad habits on purpose: failed
//! logins report their status code as a quoted string, and extended product
//! searches separate product objects with a bare CRLF and no comma.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use log::debug;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const PATH: &str = "/restservice.aspx";

pub const OK: i32 = 0;
pub const BAD_APPLICATION: i32 = 100;
pub const BAD_SESSION: i32 = 110;
pub const LOGIN_FAILED: i32 = 150;
pub const PRODUCT_NOT_FOUND: i32 = 200;
pub const BAD_QUANTITY: i32 = 210;
pub const MISSING_SEARCH_TEXT: i32 = 300;
pub const UNKNOWN_COMMAND: i32 = 999;

#[derive(Clone, Debug)]
pub struct Account {
    pub email: String,
    pub password: String,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_forename: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Nutrient {
    pub nutrient_name: String,
    pub sample_description: String,
    pub sample_size: String,
    pub serving_description: String,
    pub serving_size: String,
}

#[derive(Clone, Debug)]
pub struct CatalogItem {
    pub product_id: String,
    pub base_product_id: String,
    pub ean_barcode: String,
    pub name: String,
    pub price: f64,
    pub unit_price: f64,
    pub unit_type: String,
    pub price_description: String,
    pub product_type: String,
    pub maximum_purchase_quantity: i32,
    pub extended_description: String,
    pub storage_info: String,
    pub nutrients: Vec<Nutrient>,
    pub ingredients: Vec<String>,
}

/// Keys, accounts and catalog the server accepts.
#[derive(Clone, Debug)]
pub struct Fixture {
    pub developer_key: String,
    pub application_key: String,
    pub accounts: Vec<Account>,
    pub catalog: Vec<CatalogItem>,
    pub page_size: usize,
}

impl Default for Fixture {
    fn default() -> Self {
        let milk_nutrients = vec![
            Nutrient {
                nutrient_name: "Energy (kcal)".to_string(),
                sample_description: "Typical values per 100ml".to_string(),
                sample_size: "100ml".to_string(),
                serving_description: "Per 200ml serving".to_string(),
                serving_size: "200ml".to_string(),
            },
            Nutrient {
                nutrient_name: "Fat".to_string(),
                sample_description: "Typical values per 100ml".to_string(),
                sample_size: "100ml".to_string(),
                serving_description: "Per 200ml serving".to_string(),
                serving_size: "200ml".to_string(),
            },
        ];
        Self {
            developer_key: "dev-key".to_string(),
            application_key: "app-key".to_string(),
            accounts: vec![Account {
                email: "shopper@example.com".to_string(),
                password: "secret".to_string(),
                customer_id: "1001".to_string(),
                customer_name: "Mx Shopper".to_string(),
                customer_forename: "Sam".to_string(),
            }],
            catalog: vec![
                CatalogItem {
                    product_id: "254656543".to_string(),
                    base_product_id: "50112346".to_string(),
                    ean_barcode: "5000169005071".to_string(),
                    name: "Semi Skimmed Milk 2 Pints".to_string(),
                    price: 1.10,
                    unit_price: 0.97,
                    unit_type: "Litre".to_string(),
                    price_description: "£0.97/Litre".to_string(),
                    product_type: "QuantityOnlyProduct".to_string(),
                    maximum_purchase_quantity: 99,
                    extended_description: "Pasteurised, homogenised semi skimmed milk".to_string(),
                    storage_info: "Keep refrigerated".to_string(),
                    nutrients: milk_nutrients.clone(),
                    ingredients: vec!["Semi Skimmed Milk".to_string()],
                },
                CatalogItem {
                    product_id: "254656544".to_string(),
                    base_product_id: "50112347".to_string(),
                    ean_barcode: "5000169005088".to_string(),
                    name: "Whole Milk 4 Pints".to_string(),
                    price: 1.45,
                    unit_price: 0.64,
                    unit_type: "Litre".to_string(),
                    price_description: "£0.64/Litre".to_string(),
                    product_type: "QuantityOnlyProduct".to_string(),
                    maximum_purchase_quantity: 99,
                    extended_description: "Pasteurised, homogenised whole milk".to_string(),
                    storage_info: "Keep refrigerated".to_string(),
                    nutrients: milk_nutrients,
                    ingredients: vec!["Whole Milk".to_string()],
                },
                CatalogItem {
                    product_id: "268142733".to_string(),
                    base_product_id: "59988621".to_string(),
                    ean_barcode: "0000000253915".to_string(),
                    name: "Braeburn Apples Loose".to_string(),
                    price: 0.31,
                    unit_price: 2.00,
                    unit_type: "kg".to_string(),
                    price_description: "£2.00/kg".to_string(),
                    product_type: "CatchWeightProduct".to_string(),
                    maximum_purchase_quantity: 50,
                    extended_description: "Crisp, sweet and aromatic".to_string(),
                    storage_info: "Store in a cool, dry place".to_string(),
                    nutrients: Vec::new(),
                    ingredients: Vec::new(),
                },
            ],
            page_size: 20,
        }
    }
}

#[derive(Clone, Debug)]
struct BasketEntry {
    product_id: String,
    quantity: i64,
    substitute: bool,
}

#[derive(Clone, Debug)]
struct Basket {
    id: String,
    entries: Vec<BasketEntry>,
}

#[derive(Debug)]
pub struct Store {
    fixture: Fixture,
    /// Session key to customer id.
    sessions: HashMap<String, String>,
    /// Customer id to basket; baskets survive a new login.
    baskets: HashMap<String, Basket>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with(Fixture::default())
}

pub fn app_with(fixture: Fixture) -> Router {
    let db: Db = Arc::new(RwLock::new(Store {
        fixture,
        sessions: HashMap::new(),
        baskets: HashMap::new(),
    }));
    Router::new().route(PATH, get(dispatch)).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

type Params = HashMap<String, String>;

async fn dispatch(State(db): State<Db>, Query(params): Query<Params>) -> impl IntoResponse {
    let command = params.get("COMMAND").map(String::as_str).unwrap_or_default();
    debug!("Dispatching {command:?}");
    let body = match command {
        "LOGIN" => login(&mut *db.write().await, &params),
        "PRODUCTSEARCH" => product_search(&*db.read().await, &params),
        "CHANGEBASKET" => change_basket(&mut *db.write().await, &params),
        "LISTBASKET" => list_basket(&*db.read().await, &params),
        _ => status(UNKNOWN_COMMAND, "Unknown command"),
    };
    ([(header::CONTENT_TYPE, "application/json")], body)
}

fn param<'a>(params: &'a Params, key: &str) -> &'a str {
    params.get(key).map(String::as_str).unwrap_or_default()
}

fn status(code: i32, info: &str) -> String {
    serde_json::json!({ "StatusCode": code, "StatusInfo": info }).to_string()
}

fn session_customer<'a>(store: &'a Store, params: &Params) -> Option<&'a str> {
    store
        .sessions
        .get(param(params, "SESSIONKEY"))
        .map(String::as_str)
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct LoginBody<'a> {
    status_code: i32,
    status_info: &'a str,
    branch_number: &'a str,
    customer_id: &'a str,
    customer_name: &'a str,
    customer_forename: &'a str,
    session_key: &'a str,
    in_amend_order_mode: &'a str,
    chosen_delivery_slot_info: &'a str,
}

fn login(store: &mut Store, params: &Params) -> String {
    let fixture = &store.fixture;
    if param(params, "DEVELOPERKEY") != fixture.developer_key
        || param(params, "APPLICATIONKEY") != fixture.application_key
    {
        return status(BAD_APPLICATION, "Developer or application key is not valid");
    }
    let Some(account) = fixture.accounts.iter().find(|a| {
        a.email.eq_ignore_ascii_case(param(params, "EMAIL")) && a.password == param(params, "PASSWORD")
    }) else {
        // The real service quotes this particular status code.
        let info = serde_json::to_string("Login failed, invalid email or password")
            .expect("Strings always serialize");
        return format!("{{\"StatusCode\": \"{LOGIN_FAILED}\", \"StatusInfo\": {info}}}");
    };

    let session_key = Uuid::new_v4().simple().to_string();
    let body = serde_json::to_string(&LoginBody {
        status_code: OK,
        status_info: "Command Processed OK",
        branch_number: "2431",
        customer_id: &account.customer_id,
        customer_name: &account.customer_name,
        customer_forename: &account.customer_forename,
        session_key: &session_key,
        in_amend_order_mode: "N",
        chosen_delivery_slot_info: "No delivery slot is reserved.",
    })
    .expect("Login body always serializes");

    let customer_id = account.customer_id.clone();
    store
        .baskets
        .entry(customer_id.clone())
        .or_insert_with(|| Basket {
            id: Uuid::new_v4().simple().to_string(),
            entries: Vec::new(),
        });
    store.sessions.insert(session_key, customer_id);
    body
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ProductBody<'a> {
    base_product_id: &'a str,
    #[serde(rename = "EANBarcode")]
    ean_barcode: &'a str,
    extended_description: &'a str,
    image_path: String,
    maximum_purchase_quantity: i32,
    name: &'a str,
    price: f64,
    price_description: &'a str,
    product_id: &'a str,
    product_type: &'a str,
    storage_info: &'a str,
    unit_price: f64,
    unit_type: &'a str,
    nutrients_count: usize,
    nutrients: &'a [Nutrient],
    ingredients_count: usize,
    ingredients: Vec<IngredientBody<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct IngredientBody<'a> {
    name: &'a str,
}

impl<'a> ProductBody<'a> {
    fn new(item: &'a CatalogItem, extended: bool) -> Self {
        let text = |value: &'a String| if extended { value.as_str() } else { "" };
        let nutrients: &[Nutrient] = if extended { &item.nutrients } else { &[] };
        let ingredients: Vec<IngredientBody<'a>> = if extended {
            item.ingredients
                .iter()
                .map(|name| IngredientBody { name })
                .collect()
        } else {
            Vec::new()
        };
        Self {
            base_product_id: &item.base_product_id,
            ean_barcode: &item.ean_barcode,
            extended_description: text(&item.extended_description),
            image_path: format!("http://img.example.com/{}.jpg", item.product_id),
            maximum_purchase_quantity: item.maximum_purchase_quantity,
            name: &item.name,
            price: item.price,
            price_description: &item.price_description,
            product_id: &item.product_id,
            product_type: &item.product_type,
            storage_info: text(&item.storage_info),
            unit_price: item.unit_price,
            unit_type: &item.unit_type,
            nutrients_count: nutrients.len(),
            nutrients,
            ingredients_count: ingredients.len(),
            ingredients,
        }
    }
}

fn matches(item: &CatalogItem, search: &str) -> bool {
    let is_barcode = search.len() == 13 && search.bytes().all(|b| b.is_ascii_digit());
    if is_barcode {
        return item.ean_barcode == search;
    }
    item.product_id == search || item.name.to_lowercase().contains(&search.to_lowercase())
}

fn product_search(store: &Store, params: &Params) -> String {
    if session_customer(store, params).is_none() {
        return status(BAD_SESSION, "Session key is not valid");
    }
    let search = param(params, "SEARCHTEXT").trim();
    if search.is_empty() {
        return status(MISSING_SEARCH_TEXT, "Search text is required");
    }
    let extended = param(params, "EXTENDEDINFO") == "Y";
    let page = param(params, "PAGE").parse::<usize>().unwrap_or(1).max(1);
    let page_size = store.fixture.page_size.max(1);

    let found: Vec<&CatalogItem> = store
        .fixture
        .catalog
        .iter()
        .filter(|item| matches(item, search))
        .collect();
    let total_pages = found.len().div_ceil(page_size);
    let products: Vec<String> = found
        .iter()
        .skip((page - 1).saturating_mul(page_size))
        .take(page_size)
        .map(|item| {
            serde_json::to_string(&ProductBody::new(item, extended))
                .expect("Product body always serializes")
        })
        .collect();

    // Extended listings drop the commas between product objects.
    let separator = if extended { "\r\n" } else { ",\r\n" };
    format!(
        "{{\"StatusCode\": {OK}, \"StatusInfo\": \"Command Processed OK\", \
         \"PageNumber\": {page}, \"TotalPageCount\": {total_pages}, \
         \"TotalProductCount\": {}, \"PageProductCount\": {}, \"Products\": [\r\n{}\r\n]}}",
        found.len(),
        products.len(),
        products.join(separator),
    )
}

fn change_basket(store: &mut Store, params: &Params) -> String {
    let Some(customer_id) = session_customer(store, params).map(str::to_string) else {
        return status(BAD_SESSION, "Session key is not valid");
    };
    let Ok(delta) = param(params, "CHANGEQUANTITY").parse::<i64>() else {
        return status(BAD_QUANTITY, "Change quantity is not a number");
    };
    let product_id = param(params, "PRODUCTID");
    if !store.fixture.catalog.iter().any(|i| i.product_id == product_id) {
        return status(PRODUCT_NOT_FOUND, "Product not found");
    }
    let substitute = param(params, "SUBSTITUTION") == "Y";

    let Some(basket) = store.baskets.get_mut(&customer_id) else {
        return status(BAD_SESSION, "Session key is not valid");
    };
    apply_change(basket, product_id, delta, substitute);
    status(OK, "Command Processed OK")
}

/// Insert, increment, decrement or remove a line. Quantities are counts of
/// items whatever the product's pricing unit.
fn apply_change(basket: &mut Basket, product_id: &str, delta: i64, substitute: bool) {
    match basket.entries.iter().position(|e| e.product_id == product_id) {
        Some(index) => {
            let entry = &mut basket.entries[index];
            entry.quantity = entry.quantity.saturating_add(delta);
            entry.substitute = substitute;
            if entry.quantity <= 0 {
                basket.entries.remove(index);
            }
        }
        None if delta > 0 => basket.entries.push(BasketEntry {
            product_id: product_id.to_string(),
            quantity: delta,
            substitute,
        }),
        None => {}
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct BasketLineBody<'a> {
    basket_line_error_message: &'a str,
    basket_line_guide_price: String,
    basket_line_promo_message: &'a str,
    basket_line_quantity: String,
    base_product_id: &'a str,
    #[serde(rename = "EANBarcode")]
    ean_barcode: &'a str,
    maximum_purchase_quantity: i32,
    name: &'a str,
    price: f64,
    price_description: &'a str,
    product_id: &'a str,
    product_type: &'a str,
    unit_price: f64,
    unit_type: &'a str,
    note_for_personal_shopper: &'a str,
    substitution_note: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct BasketBody<'a> {
    status_code: i32,
    status_info: &'a str,
    #[serde(rename = "BasketID")]
    basket_id: &'a str,
    in_amend_order_mode: &'a str,
    basket_guide_multi_buy_savings: &'a str,
    basket_guide_price: String,
    basket_quantity: String,
    basket_total_clubcard_points: String,
    basket_lines: Vec<BasketLineBody<'a>>,
}

fn list_basket(store: &Store, params: &Params) -> String {
    let Some(basket) = session_customer(store, params).and_then(|c| store.baskets.get(c)) else {
        return status(BAD_SESSION, "Session key is not valid");
    };
    let fast = param(params, "FAST") == "Y";

    let mut total = 0.0;
    let mut quantity: i64 = 0;
    let basket_lines = basket
        .entries
        .iter()
        .filter_map(|entry| {
            let item = store
                .fixture
                .catalog
                .iter()
                .find(|i| i.product_id == entry.product_id)?;
            let line_price = item.price * entry.quantity as f64;
            total += line_price;
            quantity = entry.quantity.saturating_add(quantity);
            Some(BasketLineBody {
                basket_line_error_message: "",
                basket_line_guide_price: format!("{line_price:.2}"),
                basket_line_promo_message: "",
                basket_line_quantity: entry.quantity.to_string(),
                base_product_id: &item.base_product_id,
                ean_barcode: if fast { "" } else { item.ean_barcode.as_str() },
                maximum_purchase_quantity: item.maximum_purchase_quantity,
                name: &item.name,
                price: item.price,
                price_description: &item.price_description,
                product_id: &item.product_id,
                product_type: &item.product_type,
                unit_price: item.unit_price,
                unit_type: &item.unit_type,
                note_for_personal_shopper: "",
                substitution_note: if entry.substitute {
                    "Substitute if unavailable"
                } else {
                    ""
                },
            })
        })
        .collect();

    serde_json::to_string(&BasketBody {
        status_code: OK,
        status_info: "Command Processed OK",
        basket_id: &basket.id,
        in_amend_order_mode: "N",
        basket_guide_multi_buy_savings: "0.00",
        basket_guide_price: format!("{total:.2}"),
        basket_quantity: quantity.to_string(),
        basket_total_clubcard_points: format!("{}", total.floor() as i64),
        basket_lines,
    })
    .expect("Basket body always serializes")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basket() -> Basket {
        Basket {
            id: "b".to_string(),
            entries: Vec::new(),
        }
    }

    fn quantity(basket: &Basket, product_id: &str) -> Option<i64> {
        basket
            .entries
            .iter()
            .find(|e| e.product_id == product_id)
            .map(|e| e.quantity)
    }

    #[test]
    fn positive_change_inserts_then_increments() {
        let mut b = basket();
        apply_change(&mut b, "1", 2, false);
        assert_eq!(quantity(&b, "1"), Some(2));
        apply_change(&mut b, "1", 3, false);
        assert_eq!(quantity(&b, "1"), Some(5));
    }

    #[test]
    fn negative_change_decrements_then_removes() {
        let mut b = basket();
        apply_change(&mut b, "1", 5, false);
        apply_change(&mut b, "1", -2, false);
        assert_eq!(quantity(&b, "1"), Some(3));
        apply_change(&mut b, "1", -3, false);
        assert_eq!(quantity(&b, "1"), None);
    }

    #[test]
    fn negative_change_on_absent_product_is_ignored() {
        let mut b = basket();
        apply_change(&mut b, "1", -4, false);
        assert!(b.entries.is_empty());
    }

    #[test]
    fn lines_keep_insertion_order() {
        let mut b = basket();
        apply_change(&mut b, "2", 1, false);
        apply_change(&mut b, "1", 1, false);
        apply_change(&mut b, "2", 1, true);
        let ids: Vec<_> = b.entries.iter().map(|e| e.product_id.as_str()).collect();
        assert_eq!(ids, ["2", "1"]);
        assert!(b.entries[0].substitute);
    }

    #[test]
    fn huge_changes_saturate() {
        let mut b = basket();
        apply_change(&mut b, "1", i64::MAX, false);
        apply_change(&mut b, "1", i64::MAX, false);
        assert_eq!(quantity(&b, "1"), Some(i64::MAX));
        apply_change(&mut b, "1", i64::MIN, false);
        assert_eq!(quantity(&b, "1"), None);
    }

    #[test]
    fn page_far_past_the_end_is_empty() {
        let store = Store {
            fixture: Fixture::default(),
            sessions: HashMap::from([("k".to_string(), "1001".to_string())]),
            baskets: HashMap::new(),
        };
        let page = usize::MAX.to_string();
        let params: Params = [
            ("SESSIONKEY", "k"),
            ("SEARCHTEXT", "milk"),
            ("PAGE", page.as_str()),
            ("EXTENDEDINFO", "N"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let value: serde_json::Value =
            serde_json::from_str(&product_search(&store, &params)).unwrap();
        assert_eq!(value["StatusCode"], 0);
        assert_eq!(value["TotalProductCount"], 2);
        assert_eq!(value["PageProductCount"], 0);
    }

    #[test]
    fn barcode_search_matches_exactly() {
        let fixture = Fixture::default();
        let milk = &fixture.catalog[0];
        assert!(matches(milk, "5000169005071"));
        assert!(!matches(milk, "5000169005088"));
        assert!(matches(milk, "semi skimmed"));
        assert!(matches(milk, "254656543"));
    }

    #[test]
    fn status_body_has_numeric_code() {
        let value: serde_json::Value = serde_json::from_str(&status(BAD_SESSION, "nope")).unwrap();
        assert_eq!(value["StatusCode"], 110);
        assert_eq!(value["StatusInfo"], "nope");
    }
}
