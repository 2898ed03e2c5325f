use common::{BusinessEntityId, Currency, Money};
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{Adjustment, AdjustmentKind, CheckoutSession, LineItem, Order};
use gateway::checkout::{CheckoutUrls, build_line_items, build_set_express_checkout};
use gateway::remote::Amount;
use gateway::{GatewayAdapter, GatewayConfig, InMemoryExpressCheckout};
use rust_decimal::Decimal;
use store::InMemoryCheckoutStore;
use url::Url;

fn sample_order(lines: usize) -> Order {
    let mut order = Order::new("R-BENCH", Currency::usd());
    for i in 0..lines {
        order.add_line_item(LineItem::new(
            format!("SKU-{i:03}"),
            format!("Widget {i}"),
            2,
            Money::from_cents(1250),
        ));
    }
    order.add_adjustment(Adjustment::new("Tax", Money::from_cents(400), AdjustmentKind::Tax));
    order.add_adjustment(Adjustment::new(
        "UPS Ground",
        Money::from_cents(800),
        AdjustmentKind::Shipping,
    ));
    order.add_adjustment(Adjustment::new(
        "Promo SPRING",
        Money::from_cents(-500),
        AdjustmentKind::Promotion,
    ));
    order
}

fn bench_line_items(c: &mut Criterion) {
    let order = sample_order(25);

    c.bench_function("gateway/build_line_items_25", |b| {
        b.iter(|| build_line_items(&order));
    });
}

fn bench_set_express_checkout(c: &mut Criterion) {
    let order = sample_order(25);
    let config = GatewayConfig::sandbox(BusinessEntityId::new("bench"));
    let urls = CheckoutUrls::new(Url::parse("https://shop.test/").unwrap());

    c.bench_function("gateway/build_set_express_checkout_25", |b| {
        b.iter(|| build_set_express_checkout(&order, &config, &urls, 1));
    });
}

fn bench_authorize_in_memory(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let provider = InMemoryExpressCheckout::new();
    provider.register_session("EC-BENCH", Amount::new(Currency::usd(), Decimal::new(5000, 2)));
    let adapter = GatewayAdapter::new(
        GatewayConfig::sandbox(BusinessEntityId::new("bench")),
        provider,
        InMemoryCheckoutStore::new(),
    );

    c.bench_function("gateway/authorize_in_memory", |b| {
        b.iter(|| {
            rt.block_on(async {
                let mut session = CheckoutSession::new("EC-BENCH", "PAYER-1");
                adapter
                    .authorize(Money::from_cents(5000), &mut session)
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_line_items,
    bench_set_express_checkout,
    bench_authorize_in_memory
);
criterion_main!(benches);
