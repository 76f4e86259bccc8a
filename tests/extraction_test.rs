use rs_product_extract::conflict::{self, Source};
use rs_product_extract::noise::NoiseFilter;
use rs_product_extract::{extract_product, Error, Options};
use serde_json::{json, Value};

const BASE: &str = "https://shop.example.com/p/lift-chair";

fn options() -> Options {
    Options {
        url: Some(BASE.to_string()),
        ..Options::default()
    }
}

#[test]
fn structured_data_takes_precedence_and_dom_fills_gaps() {
    let html = r#"
        <html><head>
          <script type="application/ld+json">
          {"@context": "https://schema.org", "@type": "Product",
           "name": "Comfort Lift Chair", "brand": {"@type": "Brand", "name": "Acme"},
           "sku": "LC-300",
           "additionalProperty": [{"@type": "PropertyValue", "name": "Weight Capacity", "value": "350 lbs"}]}
          </script>
        </head><body>
          <main>
            <h1>Comfort Lift Chair - Sale!</h1>
            <div class="product-description">
              <p>A power lift recliner with a quiet motor and a wall-hugger design.</p>
            </div>
            <table class="specifications">
              <tr><th>Weight Capacity</th><td>300 lbs</td></tr>
              <tr><th>Seat Width</th><td>21 in</td></tr>
            </table>
          </main>
        </body></html>
    "#;

    let output = extract_product(html, &options()).unwrap();
    let record = output.record;

    assert_eq!(record.name, "Comfort Lift Chair");
    assert_eq!(record.brand.as_deref(), Some("Acme"));
    assert_eq!(record.sku.as_deref(), Some("LC-300"));
    assert!(record.description.starts_with("A power lift recliner"));
    assert_eq!(record.specs.get("weight_capacity").map(String::as_str), Some("350 lb"));
    assert_eq!(record.specs.get("seat_width").map(String::as_str), Some("21 in"));
}

#[test]
fn microdata_product_is_read() {
    let html = r#"
        <html><body>
          <div itemscope itemtype="https://schema.org/Product">
            <h2 itemprop="name">Bariatric Rollator</h2>
            <span itemprop="brand">Acme</span>
            <p itemprop="description">Heavy-duty rollator with a wide seat and large wheels.</p>
          </div>
        </body></html>
    "#;

    let record = extract_product(html, &options()).unwrap().record;
    assert_eq!(record.name, "Bariatric Rollator");
    assert_eq!(record.brand.as_deref(), Some("Acme"));
}

#[test]
fn commerce_noise_never_reaches_features() {
    let html = r#"
        <html><body><main>
          <h1>Knee Scooter</h1>
          <ul class="product-features">
            <li>Add to cart</li>
            <li>Steerable front wheels</li>
            <li>Free shipping on orders over $50</li>
            <li>Padded knee platform</li>
            <li>padded knee platform</li>
          </ul>
        </main></body></html>
    "#;

    let record = extract_product(html, &options()).unwrap().record;
    assert_eq!(record.features, vec!["Steerable front wheels", "Padded knee platform"]);
}

#[test]
fn sanitize_is_idempotent() {
    let html = r#"
        <html><body><main>
          <h1>  Shower   Chair </h1>
          <div class="product-description"><p>A rust-proof shower chair with a padded seat.</p></div>
          <ul class="product-features"><li>Tool-free assembly</li><li>Adjustable legs</li></ul>
          <table><tr><th>Weight Capacity</th><td>250 Pounds</td></tr></table>
        </main></body></html>
    "#;
    let opts = Options {
        sanitize: true,
        ..options()
    };

    let mut record = extract_product(html, &opts).unwrap().record;
    let once = record.clone();
    NoiseFilter::default().sanitize_record(&mut record, opts.max_images, opts.max_manuals);

    assert_eq!(record, once);
    assert_eq!(record.name, "Shower Chair");
}

#[test]
fn markdown_renderings_are_published_on_request() {
    let html = r#"
        <html><body><main>
          <h1>Transport Chair</h1>
          <div class="product-description"><p>A folding transport chair for travel.</p></div>
          <ul class="product-features"><li>Folds in seconds</li></ul>
          <table><tr><th>Seat Width</th><td>19 in</td></tr></table>
        </main></body></html>
    "#;
    let opts = Options {
        markdown: true,
        ..options()
    };

    let published = serde_json::to_value(extract_product(html, &opts).unwrap().published(&opts)).unwrap();

    assert_eq!(published["name_raw"], "Transport Chair");
    assert_eq!(published["features_md"], "- Folds in seconds");
    assert!(published["specs_md"]
        .as_str()
        .is_some_and(|t| t.starts_with("| Specification") && t.contains("| Seat Width ") && t.contains("19 in")));
    assert!(published.get("diagnostics").is_none());

    let plain = serde_json::to_value(extract_product(html, &options()).unwrap().published(&options())).unwrap();
    assert!(plain.get("features_md").is_none());
}

#[test]
fn empty_page_is_no_content() {
    let err = extract_product("<html><body><nav><a href='/'>Home</a></nav></body></html>", &options()).unwrap_err();
    assert!(matches!(err, Error::NoContent));
}

#[test]
fn three_way_reconciliation_logs_disagreement() {
    let dom = json!({"color": "Red"});
    let pdf = json!({"color": "Red", "size": "M"});
    let live = json!({"color": "Blue"});
    let as_map = |v: &Value| v.as_object().cloned().unwrap_or_default();

    let (resolved, conflicts) = conflict::resolve(Some(&as_map(&dom)), Some(&as_map(&pdf)), Some(&as_map(&live)));

    assert_eq!(Value::Object(resolved), json!({"color": "Red", "size": "M"}));
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].chosen_source, Source::Dom);
    assert_eq!(conflicts[0].discarded_values(), vec!["Blue (from C)"]);
}
