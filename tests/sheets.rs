use sheet_dataset_sync::domain::{Cell, FetchedTable};
use sheet_dataset_sync::encode::encode_csv;
use sheet_dataset_sync::sanitize::sanitize_rows;
use sheet_dataset_sync::sheets::{parse_table, strip_jsonp};

const GVIZ_RESPONSE: &str = "/*O_o*/\ngoogle.visualization.Query.setResponse({\"version\":\"0.6\",\"reqId\":\"0\",\"status\":\"ok\",\"sig\":\"1\",\"table\":{\"cols\":[{\"id\":\"A\",\"label\":\"Timestamp\",\"type\":\"datetime\",\"pattern\":\"M/d/yyyy H:mm:ss\"},{\"id\":\"B\",\"label\":\"PM2.5\",\"type\":\"number\",\"pattern\":\"General\"},{\"id\":\"C\",\"label\":\"Site\",\"type\":\"string\"}],\"rows\":[{\"c\":[{\"v\":\"Date(2023,0,15,8,0,0)\",\"f\":\"1/15/2023 8:00:00\"},{\"v\":14.6789,\"f\":\"14.6789\"},{\"v\":\"North\"}]},{\"c\":[{\"v\":\"Date(2023,11,1,9,30,0)\"},{\"v\":3.0},null]}],\"parsedNumHeaders\":1}});";

#[test]
fn gviz_payload_to_csv() {
    let (header, rows) = parse_table(strip_jsonp(GVIZ_RESPONSE).unwrap(), true).unwrap();
    let table = FetchedTable {
        sheet_name: "Air Quality".parse().unwrap(),
        header,
        rows: sanitize_rows(rows),
    };

    assert_eq!(
        encode_csv(&table.into_rows()),
        "Timestamp,PM2.5,Site\n2023-01-15 08:00,14.68,North\n2023-12-01 09:30,3,"
    );
}

#[test]
fn header_labels_are_not_date_rewritten() {
    let json = r#"{"table":{"cols":[{"label":"Date(2023,0,1)"}],"rows":[{"c":[{"v":"Date(2023,0,1)"}]}]}}"#;
    let (header, rows) = parse_table(json, true).unwrap();
    let table = FetchedTable {
        sheet_name: "Dates".parse().unwrap(),
        header,
        rows: sanitize_rows(rows),
    };

    let rows = table.into_rows();
    assert_eq!(rows[0], vec![Cell::Text("Date(2023,0,1)".into())]);
    assert_eq!(rows[1], vec![Cell::Text("2023-01-01".into())]);
}
