/// Returns true if `number` is a non-empty string of ASCII digits that fits in an `i64` and passes the Luhn checksum.
pub fn is_valid_order_number(number: &str) -> bool {
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if number.parse::<i64>().is_err() {
        return false;
    }
    let sum = number
        .bytes()
        .rev()
        .map(|b| u32::from(b - b'0'))
        .enumerate()
        .map(|(i, d)| match (i % 2, d * 2) {
            (0, _) => d,
            (_, doubled) if doubled > 9 => doubled - 9,
            (_, doubled) => doubled,
        })
        .sum::<u32>();
    sum % 10 == 0
}
