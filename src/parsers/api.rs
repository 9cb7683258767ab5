use serde_json::Value;

/// Places the check_player API has been seen to put the match percentage,
/// in the order they are consulted.
pub const PERCENTAGE_POINTERS: [&str; 3] = [
    "/match_percentage",
    "/result/percentage",
    "/data/match/percent",
];

/// Match percentage from a check_player response: the first non-null value
/// among [`PERCENTAGE_POINTERS`], as long as it reads as a number from 0 to 100.
pub fn extract_percentage(response: &Value) -> Option<u8> {
    let value = PERCENTAGE_POINTERS
        .iter()
        .filter_map(|pointer| response.pointer(pointer))
        .find(|v| !v.is_null())?;
    as_percentage(value)
}

fn as_percentage(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => match n.as_u64() {
            Some(u) => u,
            None => {
                let f = n.as_f64()?;
                if f < 0.0 {
                    return None;
                }
                f.round() as u64
            }
        },
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            s.parse().ok()?
        }
        _ => return None,
    };
    u8::try_from(number).ok().filter(|p| *p <= 100)
}
