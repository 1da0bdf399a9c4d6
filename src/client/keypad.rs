/// Map a phone keypad digit to a move direction.
///
/// `2` is up, `8` and `0` are down, `4` is left and `6` is right. Every
/// other key has no direction.
pub fn direction(key: char) -> Option<&'static str> {
    match key {
        '2' => Some("UP"),
        '0' | '8' => Some("DOWN"),
        '4' => Some("LEFT"),
        '6' => Some("RIGHT"),
        _ => None,
    }
}

/// Directions for every mappable key in `keys`, in order, together with the
/// keys that were skipped.
pub fn directions(keys: &str) -> (Vec<&'static str>, Vec<char>) {
    let mut moves = Vec::new();
    let mut skipped = Vec::new();

    for key in keys.chars() {
        match direction(key) {
            Some(dir) => moves.push(dir),
            None => skipped.push(key),
        }
    }

    (moves, skipped)
}
