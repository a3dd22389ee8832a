use mobile_agent::error::AgentError;
use mobile_agent::snapshot::flatten_page_source;

// ============================================================================
// Flattening
// ============================================================================

const ANDROID_TREE: &str = r#"<hierarchy rotation="0">
  <android.widget.FrameLayout>
    <android.widget.TextView text="Battery" resource-id="com.android.settings:id/title" clickable="true"/>
    <android.widget.Button text="Scan" class="android.widget.Button" enabled="false"/>
  </android.widget.FrameLayout>
</hierarchy>"#;

const IOS_TREE: &str = r#"<AppiumAUT>
  <XCUIElementTypeWindow>
    <XCUIElementTypeStaticText name="General" label="General" accessible="true"/>
    <XCUIElementTypeOther/>
    <XCUIElementTypeStaticText value="iPhone 15"/>
  </XCUIElementTypeWindow>
</AppiumAUT>"#;

#[test]
fn structural_containers_without_identifiers_are_dropped() {
    let elements = flatten_page_source(ANDROID_TREE, 50).unwrap();

    // hierarchy and the FrameLayout carry nothing; their children survive
    assert_eq!(elements.len(), 2);
    assert_eq!(elements[0].tag, "android.widget.TextView");
    assert_eq!(elements[1].tag, "android.widget.Button");
}

#[test]
fn android_attributes_map_onto_the_descriptor() {
    let elements = flatten_page_source(ANDROID_TREE, 50).unwrap();

    let battery = &elements[0];
    assert_eq!(battery.text.as_deref(), Some("Battery"));
    assert_eq!(battery.id.as_deref(), Some("com.android.settings:id/title"));
    assert!(battery.clickable);
    assert!(battery.enabled);

    let scan = &elements[1];
    assert_eq!(scan.class_name.as_deref(), Some("android.widget.Button"));
    assert!(!scan.enabled);
    assert_eq!(scan.xpath, "//android.widget.Button");
}

#[test]
fn ios_label_fills_in_for_missing_text() {
    let elements = flatten_page_source(IOS_TREE, 50).unwrap();

    assert_eq!(elements.len(), 2);
    let general = &elements[0];
    assert_eq!(general.text.as_deref(), Some("General"));
    assert_eq!(general.accessibility_id.as_deref(), Some("General"));
    assert!(general.clickable);

    // value is the last-resort text source
    assert_eq!(elements[1].text.as_deref(), Some("iPhone 15"));
}

#[test]
fn node_text_outranks_the_label_attribute() {
    let source = r#"<root><item label="fallback">visible text</item></root>"#;
    let elements = flatten_page_source(source, 50).unwrap();

    let item = elements
        .iter()
        .find(|e| e.tag == "item")
        .unwrap();
    assert_eq!(item.text.as_deref(), Some("visible text"));
    assert_eq!(item.label.as_deref(), Some("fallback"));
}

#[test]
fn collection_stops_at_the_cap() {
    let mut source = String::from("<AppiumAUT>");
    for i in 0..20 {
        source.push_str(&format!("<XCUIElementTypeButton name=\"btn-{}\"/>", i));
    }
    source.push_str("</AppiumAUT>");

    let elements = flatten_page_source(&source, 5).unwrap();
    assert_eq!(elements.len(), 5);
}

// ============================================================================
// Malformed input
// ============================================================================

#[test]
fn empty_source_is_its_own_error() {
    assert!(matches!(
        flatten_page_source("   ", 50),
        Err(AgentError::EmptyPageSource)
    ));
}

#[test]
fn broken_markup_reports_a_parse_error() {
    assert!(matches!(
        flatten_page_source("<hierarchy><unclosed>", 50),
        Err(AgentError::XmlParse(_))
    ));
}
