// dsmr.rs — OBIS line extraction from the decrypted telegram text

use crate::*;

/// Extract every known register of `plaintext` into a fresh snapshot.
pub fn extract(plaintext: &[u8]) -> RegisterSnapshot {
    let mut snapshot = RegisterSnapshot::new();
    extract_into(plaintext, &mut snapshot);
    snapshot
}

/// Scan `plaintext` line by line and store matched registers in `snapshot`.
///
/// The first line is the meter identification and is skipped. Scanning ends
/// at the first line starting with `!` (checksum trailer) or at the end of
/// the text, a NUL byte included. Bad lines are logged and skipped, they never
/// abort the scan.
pub fn extract_into(plaintext: &[u8], snapshot: &mut RegisterSnapshot) -> ExtractStats {
    let text = match plaintext.iter().position(|&b| b == 0) {
        Some(end) => &plaintext[..end],
        None => plaintext,
    };
    let mut stats = ExtractStats::default();

    // consecutive newlines collapse, like a strtok() split
    let mut lines = text.split(|&b| b == b'\n').filter(|l| !l.is_empty());
    if let Some(header) = lines.next() {
        trace!("DSMR: Header {:?}", String::from_utf8_lossy(header));
    }

    for raw in lines {
        if raw.first() == Some(&b'!') {
            break;
        }
        stats.lines += 1;
        match parse_line(raw) {
            Ok(None) => {}
            Ok(Some((index, value))) => {
                trace!("DSMR: {} = {value}", REGISTRY[index].name);
                snapshot.set(index, &value);
                stats.matched += 1;
            }
            Err(e @ FieldError::Unmatched(_)) => {
                debug!("DSMR: Skipping {e}");
                stats.unmatched += 1;
            }
            Err(e) => {
                warn!("DSMR: Skipping line {:?}: {e}", String::from_utf8_lossy(raw));
                stats.malformed += 1;
            }
        }
    }

    debug!(
        "DSMR: {} lines, {} matched, {} unmatched, {} malformed",
        stats.lines, stats.matched, stats.unmatched, stats.malformed
    );
    *snapshot.stats_mut() = stats;
    stats
}

/// Decode one register line. `Ok(None)` for lines without a `(`.
pub fn parse_line(raw: &[u8]) -> Result<Option<(usize, RegisterValue)>, FieldError> {
    let line = std::str::from_utf8(raw).map_err(|_| FieldError::NotUtf8)?;
    let line = line.trim_end_matches('\r');
    let Some(open) = line.find('(') else {
        return Ok(None);
    };

    let obis_id = &line[..open];
    let (index, desc) =
        lookup_obis(obis_id).ok_or_else(|| FieldError::Unmatched(obis_id.to_string()))?;

    let selected = select_group(line, desc.select)?;
    let mut value = RegisterValue::new();
    match desc.encoding {
        Encoding::Raw => push_bounded(&mut value, strip_unit(selected)),
        Encoding::HexPairs => {
            let decoded = decode_hex_pairs(selected)?;
            push_bounded(&mut value, strip_unit(&decoded));
        }
    }
    Ok(Some((index, value)))
}

/// Text strictly inside the first or the last parenthesis group.
pub fn select_group(line: &str, select: Select) -> Result<&str, FieldError> {
    let open = match select {
        Select::FirstParens => line.find('('),
        Select::LastParens => line.rfind('('),
    }
    .ok_or(FieldError::MissingParens)?;
    let rest = &line[open + 1..];
    let close = rest.find(')').ok_or(FieldError::MissingParens)?;
    Ok(&rest[..close])
}

/// `12785.123*m3` -> `12785.123`
pub fn strip_unit(value: &str) -> &str {
    match value.find('*') {
        Some(star) => &value[..star],
        None => value,
    }
}

/// `3045533031323334` -> `0ES01234`. Output beyond [`MAX_VALUE_LEN`] is
/// dropped, but the whole input is still validated.
pub fn decode_hex_pairs(hex: &str) -> Result<RegisterValue, FieldError> {
    if hex.len() % 2 != 0 {
        return Err(FieldError::OddHexLength(hex.len()));
    }
    let mut out = RegisterValue::new();
    for pair in hex.as_bytes().chunks(2) {
        let byte = hex_digit(pair[0])? << 4 | hex_digit(pair[1])?;
        if byte == 0 || !byte.is_ascii() {
            return Err(FieldError::NonTextHex);
        }
        let _ = out.push(byte as char);
    }
    Ok(out)
}

fn hex_digit(c: u8) -> Result<u8, FieldError> {
    (c as char)
        .to_digit(16)
        .map(|d| d as u8)
        .ok_or(FieldError::InvalidHexDigit(c as char))
}

fn push_bounded(out: &mut RegisterValue, value: &str) {
    for c in value.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
}

// EOF
