//! Code to fuzz the routing of edits through a [`SnippetTree`]

use rand::Rng;
use rand_distr::Geometric;
use snipsync::{
    buffer::char_slice,
    node::{LeafKind, NodeKind},
    settle, EditCmd, LineBuffer, Position, Size, SnippetTree, SpanInit, TextBuffer,
};

use crate::{runner, utils, Arbitrary};

const TEXT_CHARS: &[char] = &['a', 'b', 'c', 'é', ' ', ' ', '\n'];
const TYPED_CHARS: &[char] = &['x', 'y', 'ü', ' '];

/// A snippet, and the edits the user makes after expanding it
#[derive(Debug, Clone)]
pub struct Session {
    pieces: Vec<Piece>,
    edits: Vec<EditCmd>,
}

#[derive(Debug, Clone)]
enum Piece {
    Text(String),
    Tabstop(u32, Vec<Piece>),
    /// A mirror of the tabstop with a given number, along with that tabstop's initial text
    Mirror(u32, String),
}

impl Piece {
    fn text(&self) -> String {
        match self {
            Piece::Text(s) | Piece::Mirror(_, s) => s.clone(),
            Piece::Tabstop(_, children) => children.iter().map(Piece::text).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub pieces_distr: Geometric,
    pub text_len_distr: Geometric,
    pub typed_len_distr: Geometric,
    pub edits_distr: Geometric,
    pub max_depth: usize,
    pub tabstop_probability: f64,
    pub mirror_probability: f64,
    pub insert_probability: f64,
    pub line_break_probability: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pieces_distr: Geometric::new(1.0 / 4.0).unwrap(),
            text_len_distr: Geometric::new(1.0 / 3.0).unwrap(),
            typed_len_distr: Geometric::new(1.0 / 2.0).unwrap(),
            edits_distr: Geometric::new(1.0 / 20.0).unwrap(),
            max_depth: 3,
            tabstop_probability: 0.4,
            mirror_probability: 0.3,
            insert_probability: 0.6,
            line_break_probability: 0.15,
        }
    }
}

impl Arbitrary for Session {
    type Config = Config;

    fn gen(config: &Self::Config, rng: &mut impl Rng) -> Self {
        let mut next_number = 1;
        let mut tabstops = Vec::new();
        let mut pieces = gen_pieces(config, rng, 0, &mut next_number, &mut tabstops);
        for (number, text) in tabstops {
            if rng.gen_bool(config.mirror_probability) {
                pieces.push(Piece::Text(" = ".to_owned()));
                pieces.push(Piece::Mirror(number, text));
            }
        }

        // Edits depend on the buffer contents, which mirrors change as the session goes on, so
        // the session has to be run whilst the edits are generated
        let mut edits = Vec::new();
        let mut session = Session {
            pieces,
            edits: Vec::new(),
        };
        if let Ok((mut tree, mut buf)) = session.build() {
            for _ in 0..rng.sample(config.edits_distr) {
                let cmd = gen_edit(config, rng, &buf);
                let applied = buf.apply(&cmd);
                edits.push(cmd.clone());
                let ok = applied
                    && tree.dispatch(&cmd).is_ok()
                    && settle::converge(&mut tree, &mut buf, settle::DEFAULT_MAX_SWEEPS).is_ok();
                if !ok {
                    // Let `check` work out what went wrong
                    break;
                }
            }
        }
        session.edits = edits;
        session
    }

    fn check(&self) -> Result<usize, String> {
        let (mut tree, mut buf) = self.build().map_err(|e| format!("Building: {}", e))?;
        check_state(&tree, &buf).map_err(|e| format!("After building: {}", e))?;

        let mut edits_made = 0;
        for cmd in &self.edits {
            // Shrinking can make later edits not fit any more
            if !buf.apply(cmd) {
                continue;
            }
            tree.dispatch(cmd)
                .map_err(|e| format!("Dispatching {}: {}", cmd, e))?;
            settle::converge(&mut tree, &mut buf, settle::DEFAULT_MAX_SWEEPS)
                .map_err(|e| format!("Settling after {}: {}", cmd, e))?;
            check_state(&tree, &buf).map_err(|e| format!("After {}: {}", cmd, e))?;
            edits_made += 1;
        }
        Ok(edits_made)
    }

    fn smaller_cases(&self) -> Box<dyn Iterator<Item = Self> + '_> {
        let fewer_edits = utils::remove_one(&self.edits).map(move |edits| Session {
            pieces: self.pieces.clone(),
            edits,
        });
        let fewer_pieces = utils::remove_one(&self.pieces).map(move |pieces| Session {
            pieces,
            edits: self.edits.clone(),
        });
        Box::new(fewer_edits.chain(fewer_pieces))
    }
}

impl Session {
    /// Expands the snippet into an empty buffer, returning the tree and the buffer
    fn build(&self) -> Result<(SnippetTree, LineBuffer), snipsync::Error> {
        let text: String = self.pieces.iter().map(Piece::text).collect();
        let origin = Position::default();
        let mut tree = SnippetTree::new(SpanInit::new(origin, origin, text));
        let mut buf = LineBuffer::from_text("");
        let root = tree.root();
        add_pieces(&mut tree, root, Position::default(), &self.pieces)?;
        tree.materialize(&mut buf)?;
        settle::converge(&mut tree, &mut buf, settle::DEFAULT_MAX_SWEEPS)?;
        Ok((tree, buf))
    }
}

fn add_pieces(
    tree: &mut SnippetTree,
    parent: snipsync::NodeId,
    start: Position,
    pieces: &[Piece],
) -> Result<(), snipsync::Error> {
    let mut cursor = start;
    for piece in pieces {
        let text = piece.text();
        let end = cursor + Size::from(text.as_str());
        let init = SpanInit::new(cursor, end, text);
        match piece {
            Piece::Text(_) => {
                tree.add_leaf(parent, init)?;
            }
            Piece::Mirror(number, _) => {
                tree.add_mirror(parent, *number, init)?;
            }
            Piece::Tabstop(number, children) => {
                let id = tree.add_tabstop(parent, *number, init)?;
                add_pieces(tree, id, cursor, children)?;
            }
        }
        cursor = end;
    }
    Ok(())
}

/// Checks everything that should be true of a tree which has settled:
/// - the tree is structurally sound
/// - the root covers the whole buffer
/// - fixed text is never changed
/// - mirrors match their tabstops
fn check_state(tree: &SnippetTree, buf: &LineBuffer) -> Result<(), String> {
    tree.check_invariants().map_err(|e| e.to_string())?;

    let root = tree
        .node(tree.root())
        .ok_or_else(|| "Root is gone".to_owned())?;
    if (root.start(), root.end()) != (Position::default(), buf.end()) {
        return Err(format!(
            "Root spans {}..{} but the buffer ends at {}",
            root.start(),
            root.end(),
            buf.end()
        ));
    }

    for id in tree.preorder() {
        let node = tree.node(id).ok_or_else(|| format!("{:?} is gone", id))?;
        let text = tree.current_text(id, buf).map_err(|e| e.to_string())?;
        match node.kind() {
            NodeKind::Leaf(LeafKind::Text) if text != node.initial_text() => {
                return Err(format!(
                    "Text {:?} has changed to {:?}",
                    node.initial_text(),
                    text
                ));
            }
            NodeKind::Leaf(LeafKind::Mirror { number }) => {
                if let Some(ts) = tree.tabstop(*number) {
                    let ts_text = tree.current_text(ts, buf).map_err(|e| e.to_string())?;
                    if text != ts_text {
                        return Err(format!(
                            "Mirror {:?} doesn't match tabstop {} ({:?})",
                            text, number, ts_text
                        ));
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn gen_pieces(
    config: &Config,
    rng: &mut impl Rng,
    depth: usize,
    next_number: &mut u32,
    tabstops: &mut Vec<(u32, String)>,
) -> Vec<Piece> {
    let num_pieces = rng.sample(config.pieces_distr);
    let mut pieces = Vec::new();
    for _ in 0..num_pieces {
        if depth < config.max_depth && rng.gen_bool(config.tabstop_probability) {
            let number = *next_number;
            *next_number += 1;
            let children = gen_pieces(config, rng, depth + 1, next_number, tabstops);
            let piece = Piece::Tabstop(number, children);
            tabstops.push((number, piece.text()));
            pieces.push(piece);
        } else {
            let text = utils::random_text(rng, TEXT_CHARS, config.text_len_distr);
            pieces.push(Piece::Text(text));
        }
    }
    pieces
}

/// Generates an edit which fits the current contents of `buf`
fn gen_edit(config: &Config, rng: &mut impl Rng, buf: &LineBuffer) -> EditCmd {
    let line_idx = rng.gen_range(0..buf.line_count());
    let line = buf.line(line_idx).unwrap_or("");
    let line_len = utils::char_len(line);
    let col = rng.gen_range(0..=line_len);
    let pos = Position::new(line_idx, col);

    let is_insert = rng.gen_bool(config.insert_probability);
    if is_insert || (col == line_len && line_idx + 1 == buf.line_count()) {
        let text = if rng.gen_bool(config.line_break_probability) {
            "\n".to_owned()
        } else {
            utils::random_text(rng, TYPED_CHARS, config.typed_len_distr)
        };
        EditCmd::insert(pos, text).unwrap()
    } else if col == line_len {
        EditCmd::delete(pos, "\n").unwrap()
    } else {
        let len = rng.gen_range(1..=line_len - col);
        let text = char_slice(line, col, Some(col + len)).unwrap();
        EditCmd::delete(pos, text).unwrap()
    }
}

pub fn fuzz(iteration_limit: Option<usize>) {
    runner::fuzz::<Session>(iteration_limit, Config::default());
}
