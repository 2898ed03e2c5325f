//! Builds the set-express-checkout request from an order.

use common::{Currency, Money};
use domain::Order;
use rust_decimal::Decimal;
use url::Url;

use crate::config::GatewayConfig;
use crate::remote::{
    Amount, ItemCategory, PaymentDetails, PaymentItem, SetExpressCheckoutRequest, ShipToAddress,
};

/// Name of the negative entry offsetting funds already held on the order.
pub const EXISTING_PAYMENT_ITEM: &str = "Existing Payment";

/// Return and cancel URLs of the checkout callbacks.
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    base: Url,
}

impl CheckoutUrls {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Confirm callback; the provider appends `token` and `PayerID`.
    pub fn return_url(&self, order: &Order, payment_method_id: i64) -> String {
        let mut url = self.callback("paypal/confirm");
        url.query_pairs_mut()
            .append_pair("payment_method_id", &payment_method_id.to_string())
            .append_pair("order_id", &order.number)
            .append_pair("access_token", &order.guest_token)
            .append_pair("utm_nooverride", "1");
        url.into()
    }

    /// Cancel callback; the provider appends `token`.
    pub fn cancel_url(&self, order: &Order) -> String {
        let mut url = self.callback("paypal/cancel");
        url.query_pairs_mut()
            .append_pair("order_id", &order.number)
            .append_pair("access_token", &order.guest_token);
        url.into()
    }

    fn callback(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let prefix = self.base.path().trim_end_matches('/');
        url.set_path(&format!("{prefix}/{path}"));
        url.set_query(None);
        url
    }
}

fn amount(currency: &Currency, money: Money) -> Amount {
    Amount::new(currency.clone(), money.to_decimal())
}

/// Priced entries for the provider's order summary.
///
/// One entry per line item, one per eligible adjustment that is neither tax
/// nor shipping, and a negative entry for funds already held. Zero-valued
/// entries are dropped because the provider rejects them.
pub fn build_line_items(order: &Order) -> Vec<PaymentItem> {
    let currency = &order.currency;

    let line_items = order.line_items.iter().map(|item| PaymentItem {
        name: format!("{} {}", item.quantity, item.name),
        number: Some(item.sku.clone()),
        quantity: 1,
        amount: amount(currency, item.amount()),
        category: Some(ItemCategory::Physical),
    });

    let adjustments = order
        .eligible_adjustments()
        .filter(|a| a.is_itemizable())
        .map(|a| PaymentItem {
            name: a.label.clone(),
            number: None,
            quantity: 1,
            amount: amount(currency, a.amount),
            category: None,
        });

    let existing_payment = std::iter::once(PaymentItem {
        name: EXISTING_PAYMENT_ITEM.to_string(),
        number: None,
        quantity: 1,
        amount: amount(currency, -order.authorized_payment_total()),
        category: None,
    });

    line_items
        .chain(adjustments)
        .chain(existing_payment)
        .filter(|item| !item.amount.value.is_zero())
        .collect()
}

/// Totals, items and address for one payment request.
///
/// When the items sum to zero the provider gets only the order total.
pub fn build_payment_details(
    order: &Order,
    items: Vec<PaymentItem>,
    config: &GatewayConfig,
) -> PaymentDetails {
    let currency = &order.currency;
    let order_total = amount(currency, order.outstanding_balance());
    let payment_action = config.payment_action();

    let item_sum: Decimal = items
        .iter()
        .map(|i| Decimal::from(i.quantity) * i.amount.value)
        .sum();

    if item_sum.is_zero() {
        return PaymentDetails {
            order_total,
            item_total: None,
            shipping_total: None,
            tax_total: None,
            ship_to: None,
            items: Vec::new(),
            payment_action,
        };
    }

    PaymentDetails {
        order_total,
        item_total: Some(Amount::new(currency.clone(), item_sum)),
        shipping_total: Some(amount(currency, order.ship_total())),
        tax_total: Some(amount(currency, order.tax_total())),
        ship_to: ship_to_address(order, config),
        items,
        payment_action,
    }
}

fn ship_to_address(order: &Order, config: &GatewayConfig) -> Option<ShipToAddress> {
    if !config.address_required() {
        return None;
    }
    let address = order.bill_address.as_ref()?;

    Some(ShipToAddress {
        name: address.full_name(),
        street1: address.address1.clone(),
        street2: address.address2.clone().filter(|s| !s.trim().is_empty()),
        city: address.city.clone(),
        state_or_province: address.state.clone(),
        country_code: address.country_iso.clone(),
        postal_code: address.zipcode.clone(),
    })
}

/// The complete request starting a provider session for `order`.
pub fn build_set_express_checkout(
    order: &Order,
    config: &GatewayConfig,
    urls: &CheckoutUrls,
    payment_method_id: i64,
) -> SetExpressCheckoutRequest {
    let items = build_line_items(order);

    SetExpressCheckoutRequest {
        invoice_id: order.number.clone(),
        return_url: urls.return_url(order, payment_method_id),
        cancel_url: urls.cancel_url(order),
        solution_type: config.solution.clone(),
        landing_page: config.landing_page.clone(),
        header_image: config.logo_url.clone(),
        no_shipping: true,
        payment_details: build_payment_details(order, items, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{BusinessEntityId, RecordId};
    use domain::{Address, Adjustment, AdjustmentKind, LineItem, Payment, PaymentState};
    use rust_decimal_macros::dec;

    fn config() -> GatewayConfig {
        GatewayConfig::sandbox(BusinessEntityId::new("acme"))
    }

    fn urls() -> CheckoutUrls {
        CheckoutUrls::new(Url::parse("https://shop.test/").unwrap())
    }

    fn order() -> Order {
        let mut order = Order::new("R100", Currency::usd());
        order.add_line_item(LineItem::new("SKU-1", "Widget", 2, Money::from_cents(1500)));
        order.add_adjustment(Adjustment::new("Tax", Money::from_cents(240), AdjustmentKind::Tax));
        order.add_adjustment(Adjustment::new(
            "UPS Ground",
            Money::from_cents(500),
            AdjustmentKind::Shipping,
        ));
        order.add_adjustment(Adjustment::new(
            "Promo WELCOME",
            Money::from_cents(-300),
            AdjustmentKind::Promotion,
        ));
        order
    }

    #[test]
    fn test_line_items_include_itemizable_adjustments_only() {
        let items = build_line_items(&order());

        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["2 Widget", "Promo WELCOME"]);
        assert_eq!(items[0].amount.value, dec!(30.00));
        assert_eq!(items[0].number.as_deref(), Some("SKU-1"));
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[0].category, Some(ItemCategory::Physical));
        assert_eq!(items[1].amount.value, dec!(-3.00));
    }

    #[test]
    fn test_zero_valued_items_are_dropped() {
        let mut order = order();
        order.add_line_item(LineItem::new("SKU-FREE", "Sticker", 1, Money::zero()));
        order.add_adjustment(Adjustment::new("Nothing", Money::zero(), AdjustmentKind::Other));

        let items = build_line_items(&order);
        assert!(items.iter().all(|i| !i.amount.value.is_zero()));
        assert!(!items.iter().any(|i| i.name == "1 Sticker"));
        assert!(!items.iter().any(|i| i.name == EXISTING_PAYMENT_ITEM));
    }

    #[test]
    fn test_existing_payment_is_subtracted() {
        let mut order = order();
        order.begin_payment().unwrap();
        let mut held = Payment::new(Money::from_cents(1000), Currency::usd(), RecordId::new(), 1);
        held.state = PaymentState::Completed;
        order.add_payment(held).unwrap();

        let items = build_line_items(&order);
        let existing = items.iter().find(|i| i.name == EXISTING_PAYMENT_ITEM).unwrap();
        assert_eq!(existing.amount.value, dec!(-10.00));

        let details = build_payment_details(&order, items, &config());
        assert_eq!(details.order_total.value, dec!(24.40));
        assert_eq!(details.item_total.unwrap().value, dec!(17.00));
        assert_eq!(details.shipping_total.unwrap().value, dec!(5.00));
        assert_eq!(details.tax_total.unwrap().value, dec!(2.40));
    }

    #[test]
    fn test_zero_item_sum_sends_order_total_only() {
        let mut order = Order::new("R200", Currency::usd());
        order.add_line_item(LineItem::new("SKU-1", "Widget", 1, Money::from_cents(1000)));
        order.add_adjustment(Adjustment::new(
            "Store credit",
            Money::from_cents(-1000),
            AdjustmentKind::Other,
        ));
        order.add_adjustment(Adjustment::new(
            "UPS Ground",
            Money::from_cents(500),
            AdjustmentKind::Shipping,
        ));

        let items = build_line_items(&order);
        let details = build_payment_details(&order, items, &config());
        assert_eq!(details.order_total.value, dec!(5.00));
        assert!(details.items.is_empty());
        assert!(details.item_total.is_none());
        assert!(details.shipping_total.is_none());
        assert!(details.ship_to.is_none());
    }

    #[test]
    fn test_ship_to_only_for_sole_solution() {
        let mut order = order();
        order.bill_address = Some(Address {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            address1: "1 Analytical Way".to_string(),
            address2: Some(String::new()),
            city: "London".to_string(),
            state: "Greater London".to_string(),
            country_iso: "GB".to_string(),
            zipcode: "N1 9GU".to_string(),
        });

        let mark = build_set_express_checkout(&order, &config(), &urls(), 1);
        assert!(mark.payment_details.ship_to.is_none());

        let mut sole = config();
        sole.solution = "Sole".to_string();
        let request = build_set_express_checkout(&order, &sole, &urls(), 1);
        let ship_to = request.payment_details.ship_to.unwrap();
        assert_eq!(ship_to.name, "Ada Lovelace");
        assert_eq!(ship_to.country_code, "GB");
        assert!(ship_to.street2.is_none());
        assert_eq!(request.solution_type, "Sole");
    }

    #[test]
    fn test_request_urls_and_invoice() {
        let order = order();
        let request = build_set_express_checkout(&order, &config(), &urls(), 7);

        assert_eq!(request.invoice_id, "R100");
        assert!(request.no_shipping);
        assert_eq!(request.landing_page, "Billing");
        assert_eq!(
            request.return_url,
            format!(
                "https://shop.test/paypal/confirm?payment_method_id=7&order_id=R100&access_token={}&utm_nooverride=1",
                order.guest_token
            )
        );
        assert_eq!(
            request.cancel_url,
            format!(
                "https://shop.test/paypal/cancel?order_id=R100&access_token={}",
                order.guest_token
            )
        );
    }
}
