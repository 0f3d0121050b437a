use super::{transcode, WindowsEventError};

const LOGON_EVENT: &str = r#"
<Event xmlns="http://schemas.microsoft.com/win/2004/08/events/event">
  <System>
    <Provider Name="Microsoft-Windows-Security-Auditing" Guid="{54849625-5478-4994-a5ba-3e3b0328c30d}"/>
    <EventID>4624</EventID>
    <Version>2</Version>
    <Level>0</Level>
    <Task>12544</Task>
    <Opcode>0</Opcode>
    <Keywords>0x8020000000000000</Keywords>
    <TimeCreated SystemTime="2019-11-07T10:00:00.617400700Z"/>
    <EventRecordID>5315</EventRecordID>
    <Correlation/>
    <Execution ProcessID="716" ThreadID="760"/>
    <Channel>Security</Channel>
    <Computer>DC01.example.local</Computer>
    <Security UserID="S-1-5-18"/>
  </System>
  <EventData>
    <Data Name="SubjectUserSid">S-1-5-18</Data>
    <Data Name="SubjectUserName">DC01$</Data>
    <Data Name="LogonType">3</Data>
    <Data>unnamed-first</Data>
    <Data>unnamed-second</Data>
  </EventData>
</Event>
"#;

#[test]
fn test_system_section_maps_to_fixed_shape() {
    let event = transcode(LOGON_EVENT).unwrap();
    let json = serde_json::to_value(&event).unwrap();

    let system = &json["event"]["system"];
    assert_eq!(
        system["provider"]["name"],
        "Microsoft-Windows-Security-Auditing"
    );
    assert_eq!(
        system["provider"]["guid"],
        "{54849625-5478-4994-a5ba-3e3b0328c30d}"
    );
    assert_eq!(system["eventId"], "4624");
    assert_eq!(system["version"], "2");
    assert_eq!(system["level"], "0");
    assert_eq!(system["task"], "12544");
    assert_eq!(system["opcode"], "0");
    assert_eq!(system["keywords"], "0x8020000000000000");
    assert!(system["timeCreated"]["systemTime"]
        .as_str()
        .unwrap()
        .starts_with("2019-11-07T10:00:00"));
    assert_eq!(system["eventRecordId"], "5315");
    assert_eq!(system["correlation"], serde_json::json!({}));
    assert_eq!(system["execution"]["processId"], "716");
    assert_eq!(system["execution"]["threadId"], "760");
    assert_eq!(system["channel"], "Security");
    assert_eq!(system["computer"], "DC01.example.local");
    assert_eq!(system["security"]["userId"], "S-1-5-18");
}

#[test]
fn test_named_data_populates_map_unnamed_appends_to_list() {
    let event = transcode(LOGON_EVENT).unwrap();

    assert_eq!(
        event.event.event_data_map.get("SubjectUserSid").unwrap(),
        "S-1-5-18"
    );
    assert_eq!(
        event.event.event_data_map.get("LogonType").unwrap(),
        "3"
    );
    assert_eq!(
        event.event.event_data,
        vec!["unnamed-first".to_string(), "unnamed-second".to_string()]
    );
}

#[test]
fn test_empty_sections_are_omitted_from_json() {
    let xml = r#"
<Event>
  <System>
    <Provider Name="p" Guid="{g}"/>
    <EventID>1</EventID>
    <Channel>Application</Channel>
  </System>
</Event>
"#;
    let event = transcode(xml).unwrap();
    let json = serde_json::to_value(&event).unwrap();

    let body = json["event"].as_object().unwrap();
    assert!(!body.contains_key("eventDataMap"));
    assert!(!body.contains_key("eventData"));
    assert!(!body.contains_key("userData"));
    assert_eq!(body["system"]["eventId"], "1");
    // Absent attributes come out as empty fields, not errors.
    assert_eq!(body["system"]["execution"]["processId"], "");
}

#[test]
fn test_user_data_maps_to_nested_objects() {
    let xml = r#"
<Event>
  <System><EventID>7</EventID></System>
  <UserData>
    <RuleAndFileData>
      <RuleName>allow-all</RuleName>
      <FilePath>C:\tools\run.exe</FilePath>
      <Origin>
        <Publisher>Example Corp</Publisher>
      </Origin>
    </RuleAndFileData>
  </UserData>
</Event>
"#;
    let event = transcode(xml).unwrap();
    let json = serde_json::to_value(&event).unwrap();

    let user_data = &json["event"]["userData"]["RuleAndFileData"];
    assert_eq!(user_data["RuleName"], "allow-all");
    assert_eq!(user_data["FilePath"], "C:\\tools\\run.exe");
    assert_eq!(user_data["Origin"]["Publisher"], "Example Corp");
}

#[test]
fn test_input_without_event_element_is_rejected() {
    let err = transcode("<NotAnEvent/>").unwrap_err();
    assert!(matches!(err, WindowsEventError::MissingEvent));
}

#[test]
fn test_malformed_xml_is_rejected() {
    assert!(transcode("<Event><System>").is_err());
}

#[test]
fn test_bad_system_time_is_rejected() {
    let xml = r#"<Event><System><TimeCreated SystemTime="yesterday"/></System></Event>"#;
    let err = transcode(xml).unwrap_err();
    assert!(matches!(err, WindowsEventError::Timestamp(_)));
}
