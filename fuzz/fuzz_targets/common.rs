use the_lib::{
  command::Command,
  document::Document,
  markup,
  selection::Range,
};

const MAX_OPS: usize = 128;
const MAX_TEXT_BYTES: usize = 64;

#[derive(Debug, Clone)]
pub enum Op {
  Execute(Command),
  Undo,
  Redo,
  Input(String),
  Select(Range),
  Blur,
}

/// Reads a byte stream as a sequence of editor operations.
pub fn ops_from_bytes(data: &[u8]) -> Vec<Op> {
  let mut bytes = data.iter().copied();
  let mut ops = Vec::new();
  while ops.len() < MAX_OPS {
    let Some(tag) = bytes.next() else {
      break;
    };
    let op = match tag % 14 {
      0 => Op::Execute(Command::Bold),
      1 => Op::Execute(Command::Italic),
      2 => Op::Execute(Command::Underline),
      3 => Op::Execute(Command::BulletList),
      4 => Op::Execute(Command::AlignLeft),
      5 => Op::Execute(Command::AlignCenter),
      6 => Op::Execute(Command::AlignRight),
      7 => Op::Execute(Command::Clear),
      8 => Op::Execute(Command::InsertFragment(Document::from_text(&take_text(&mut bytes)))),
      9 => Op::Undo,
      10 => Op::Redo,
      11 => Op::Input(markup::render(&Document::from_text(&take_text(&mut bytes)))),
      12 => {
        let anchor = bytes.next().unwrap_or(0);
        let head = bytes.next().unwrap_or(0);
        Op::Select(Range::new(usize::from(anchor), usize::from(head)))
      },
      _ => Op::Blur,
    };
    ops.push(op);
  }
  ops
}

fn take_text(bytes: &mut impl Iterator<Item = u8>) -> String {
  let len = usize::from(bytes.next().unwrap_or(0)) % MAX_TEXT_BYTES;
  let raw: Vec<u8> = bytes.take(len).collect();
  String::from_utf8_lossy(&raw).into_owned()
}
