use serde_json::Value;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Frame {
    Object(ObjectState),
    Array(ArrayState),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ObjectState {
    KeyOrEnd,
    Colon,
    Value,
    Comma,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ArrayState {
    ValueOrEnd,
    Comma,
}

#[derive(Clone, Copy)]
enum Token {
    None,
    Str {
        key: bool,
        escaped: bool,
        /// Offset of a pending `\u` escape and the hex digits seen so far.
        unicode: Option<(usize, u8)>,
    },
    Scalar,
}

/// Turns a prefix of a JSON document into the closest valid document.
///
/// Leading text before the first `{` or `[` is skipped and anything after
/// the top-level container closes is ignored, so fenced model output works
/// as well. An open string value is closed, open containers are closed,
/// and a dangling key, separator or partial literal is dropped.
///
/// Returns `None` if nothing usable has been received yet.
pub fn repair_json(partial: &str) -> Option<String> {
    let start = partial.find(['{', '['])?;
    let text = &partial[start..];

    let mut stack: Vec<Frame> = Vec::new();
    let mut token = Token::None;
    // The longest prefix that becomes valid once its containers are closed.
    let mut safe: Option<(usize, Vec<Frame>)> = None;

    for (idx, ch) in text.char_indices() {
        match token {
            Token::Str {
                key,
                escaped,
                unicode,
            } => {
                token = if let Some((at, seen)) = unicode {
                    let seen = seen + 1;
                    Token::Str {
                        key,
                        escaped: false,
                        unicode: (seen < 4).then_some((at, seen)),
                    }
                } else if escaped {
                    Token::Str {
                        key,
                        escaped: false,
                        unicode: (ch == 'u').then_some((idx - 1, 0)),
                    }
                } else if ch == '\\' {
                    Token::Str {
                        key,
                        escaped: true,
                        unicode: None,
                    }
                } else if ch == '"' {
                    if key {
                        if let Some(Frame::Object(state)) = stack.last_mut() {
                            *state = ObjectState::Colon;
                        }
                    } else {
                        value_done(&mut stack);
                        safe = Some((idx + 1, stack.clone()));
                    }
                    Token::None
                } else {
                    token
                };
                continue;
            }
            Token::Scalar => {
                if !(ch.is_whitespace() || matches!(ch, ',' | '}' | ']')) {
                    continue;
                }
                value_done(&mut stack);
                safe = Some((idx, stack.clone()));
                token = Token::None;
            }
            Token::None => {}
        }

        match ch {
            '{' => {
                stack.push(Frame::Object(ObjectState::KeyOrEnd));
                safe = Some((idx + 1, stack.clone()));
            }
            '[' => {
                stack.push(Frame::Array(ArrayState::ValueOrEnd));
                safe = Some((idx + 1, stack.clone()));
            }
            '}' | ']' => {
                stack.pop();
                if stack.is_empty() {
                    safe = Some((idx + 1, Vec::new()));
                    break;
                }
                value_done(&mut stack);
                safe = Some((idx + 1, stack.clone()));
            }
            ',' => match stack.last_mut() {
                Some(Frame::Object(state)) => *state = ObjectState::KeyOrEnd,
                Some(Frame::Array(state)) => *state = ArrayState::ValueOrEnd,
                None => {}
            },
            ':' => {
                if let Some(Frame::Object(state)) = stack.last_mut() {
                    *state = ObjectState::Value;
                }
            }
            '"' => {
                let key = matches!(
                    stack.last(),
                    Some(Frame::Object(ObjectState::KeyOrEnd))
                );
                token = Token::Str {
                    key,
                    escaped: false,
                    unicode: None,
                };
            }
            ch if ch.is_whitespace() => {}
            _ => token = Token::Scalar,
        }
    }

    // Prefer keeping the value that is still streaming in.
    let streaming = match token {
        Token::Str {
            key: false,
            escaped,
            unicode,
        } => {
            let cut = match unicode {
                Some((at, _)) => at,
                None if escaped => text.len() - 1,
                None => text.len(),
            };
            Some(format!("{}\"{}", &text[..cut], closers(&stack)))
        }
        Token::Scalar => Some(format!("{text}{}", closers(&stack))),
        _ => None,
    };
    if let Some(candidate) = streaming.filter(|c| is_valid(c)) {
        return Some(candidate);
    }

    let (len, frames) = safe?;
    Some(format!("{}{}", &text[..len], closers(&frames))).filter(|c| is_valid(c))
}

fn value_done(stack: &mut [Frame]) {
    match stack.last_mut() {
        Some(Frame::Object(state)) => *state = ObjectState::Comma,
        Some(Frame::Array(state)) => *state = ArrayState::Comma,
        None => {}
    }
}

fn closers(stack: &[Frame]) -> String {
    stack
        .iter()
        .rev()
        .map(|frame| match frame {
            Frame::Object(_) => '}',
            Frame::Array(_) => ']',
        })
        .collect()
}

#[inline]
fn is_valid(candidate: &str) -> bool {
    serde_json::from_str::<Value>(candidate).is_ok()
}
