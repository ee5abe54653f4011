//! Line-oriented transport for the move/answer protocol.
//!
//! Setup is two lines: the perception variant (`1` or `2`) and the goal `x y`.
//! Each move is written as `m x y`; the answer is a count `n` followed by `n`
//! lines `x y c`. The run ends with `e n`.

use std::io::{BufRead, Write};

use crate::error::{AgentError, Result};
use crate::oracle::Oracle;
use crate::perception::PerceptionVariant;
use crate::types::{Marker, Observation, Pos};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Setup {
    pub variant: PerceptionVariant,
    pub goal: Pos,
}

pub struct LineOracle<R, W> {
    reader: R,
    writer: W,
    finished: bool,
}

impl<R: BufRead, W: Write> LineOracle<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer, finished: false }
    }

    pub fn read_setup(&mut self) -> Result<Setup> {
        let selector = self.next_line()?;
        let variant = selector
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(PerceptionVariant::from_selector)
            .ok_or_else(|| {
                AgentError::Protocol(format!("unknown perception variant {:?}", selector.trim()))
            })?;
        let goal_line = self.next_line()?;
        let mut fields = goal_line.split_whitespace();
        let goal = parse_pos(&mut fields, &goal_line)?;
        Ok(Setup { variant, goal })
    }

    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }

    fn next_line(&mut self) -> Result<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(AgentError::Protocol("unexpected end of input".to_string()));
        }
        Ok(line)
    }
}

impl<R: BufRead, W: Write> Oracle for LineOracle<R, W> {
    fn request_move(&mut self, target: Pos) -> Result<Vec<Observation>> {
        if self.finished {
            return Err(AgentError::Protocol("move requested after the run ended".to_string()));
        }
        writeln!(self.writer, "m {} {}", target.x, target.y)?;
        self.writer.flush()?;

        let count_line = self.next_line()?;
        let count: usize = count_line.trim().parse().map_err(|_| {
            AgentError::Protocol(format!("expected observation count, got {:?}", count_line.trim()))
        })?;

        let mut observations = Vec::with_capacity(count);
        for _ in 0..count {
            let line = self.next_line()?;
            observations.push(parse_observation(&line)?);
        }
        Ok(observations)
    }

    fn finish(&mut self, answer: i32) -> Result<()> {
        if self.finished {
            return Err(AgentError::Protocol("run already ended".to_string()));
        }
        writeln!(self.writer, "e {answer}")?;
        self.writer.flush()?;
        self.finished = true;
        Ok(())
    }
}

pub fn parse_observation(line: &str) -> Result<Observation> {
    let mut fields = line.split_whitespace();
    let pos = parse_pos(&mut fields, line)?;
    let marker = fields
        .next()
        .and_then(Marker::from_symbol)
        .ok_or_else(|| AgentError::Protocol(format!("malformed observation {:?}", line.trim())))?;
    if fields.next().is_some() {
        return Err(AgentError::Protocol(format!("trailing data in {:?}", line.trim())));
    }
    Ok(Observation::new(pos, marker))
}

fn parse_pos<'a>(fields: &mut impl Iterator<Item = &'a str>, line: &str) -> Result<Pos> {
    let mut coordinate = || -> Result<i32> {
        fields
            .next()
            .and_then(|field| field.parse().ok())
            .ok_or_else(|| AgentError::Protocol(format!("malformed coordinates {:?}", line.trim())))
    };
    let x = coordinate()?;
    let y = coordinate()?;
    Ok(Pos::new(x, y))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::types::{ItemKind, ObserverKind};

    fn oracle(input: &str) -> LineOracle<Cursor<Vec<u8>>, Vec<u8>> {
        LineOracle::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn reads_setup_lines() {
        let mut oracle = oracle("2\n3 1\n");
        let setup = oracle.read_setup().expect("setup");
        assert_eq!(setup, Setup { variant: PerceptionVariant::Ears, goal: Pos::new(3, 1) });
    }

    #[test]
    fn rejects_unknown_variant() {
        let mut oracle = oracle("7\n3 1\n");
        assert!(matches!(oracle.read_setup(), Err(AgentError::Protocol(_))));
    }

    #[test]
    fn move_request_writes_query_and_parses_answer() {
        let mut oracle = oracle("2\n1 1 P\n2 1 H\n0\n");
        let observations = oracle.request_move(Pos::new(1, 0)).expect("first move");
        assert_eq!(
            observations,
            vec![
                Observation::new(Pos::new(1, 1), Marker::Perception),
                Observation::new(Pos::new(2, 1), Marker::Observer(ObserverKind::Hulk)),
            ]
        );
        assert!(oracle.request_move(Pos::new(1, 1)).expect("second move").is_empty());
        oracle.finish(4).expect("finish");

        let (_, written) = oracle.into_inner();
        assert_eq!(String::from_utf8(written).expect("utf8"), "m 1 0\nm 1 1\ne 4\n");
    }

    #[test]
    fn malformed_answers_are_protocol_errors() {
        assert!(matches!(oracle("x\n").request_move(Pos::new(0, 0)), Err(AgentError::Protocol(_))));
        assert!(matches!(
            oracle("1\n1 1 Q\n").request_move(Pos::new(0, 0)),
            Err(AgentError::Protocol(_))
        ));
        assert!(matches!(
            oracle("1\n1 P\n").request_move(Pos::new(0, 0)),
            Err(AgentError::Protocol(_))
        ));
        assert!(matches!(oracle("2\n1 1 P\n").request_move(Pos::new(0, 0)), Err(_)));
    }

    #[test]
    fn parses_every_marker_symbol() {
        let shield = parse_observation("4 5 S").expect("shield");
        assert_eq!(shield.marker, Marker::Item(ItemKind::Shield));
        assert_eq!(shield.pos, Pos::new(4, 5));
        for symbol in ["P", "H", "T", "M", "S", "I"] {
            let observation = parse_observation(&format!("0 0 {symbol}")).expect("marker");
            assert_eq!(observation.marker.symbol().to_string(), symbol);
        }
    }

    #[test]
    fn no_moves_after_finish() {
        let mut oracle = oracle("");
        oracle.finish(-1).expect("finish");
        assert!(matches!(oracle.request_move(Pos::new(0, 0)), Err(AgentError::Protocol(_))));
    }
}
