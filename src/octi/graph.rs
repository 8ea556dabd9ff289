use super::grid_node::{CellId, GridNode, OctiEdge, OctiEdgeId, OctiNode, OctiNodeId};
use super::{COST_CROSSING, COST_HOP, COST_HOP_DIAGONAL, COST_SINK, Direction, PORTS, bend_cost};
use log::debug;

/// Ports that link a cell to its neighbours; the reverse four are implied.
const FORWARD_PORTS: [Direction; 4] = [
    Direction::Top,
    Direction::TopRight,
    Direction::Right,
    Direction::BottomRight,
];

/// Arena holding every grid cell, octi node and octi edge of one routing run.
/// Nodes and edges refer to each other by index only.
#[derive(Debug, Clone)]
pub struct OctiGraph {
    width: usize,
    height: usize,
    cells: Vec<GridNode>,
    nodes: Vec<OctiNode>,
    edges: Vec<OctiEdge>,
}

impl OctiGraph {
    pub fn new(width: usize, height: usize) -> Self {
        let cell_count = width * height;
        let mut graph = Self {
            width,
            height,
            cells: Vec::with_capacity(cell_count),
            nodes: Vec::with_capacity(cell_count * 9),
            edges: Vec::with_capacity(cell_count * 40),
        };

        for y in 0..height {
            for x in 0..width {
                graph.build_cell(x, y);
            }
        }

        for index in 0..cell_count {
            let cell = CellId(index);
            for port in FORWARD_PORTS {
                let Some(neighbour) = graph.neighbour(cell, port) else {
                    continue;
                };
                let weight = if port.is_diagonal() {
                    COST_HOP_DIAGONAL
                } else {
                    COST_HOP
                };
                let from = graph.cells[cell.0].node(port);
                let to = graph.cells[neighbour.0].node(port.opposite());
                graph.add_edge(from, to, weight);
            }
        }

        debug!(
            "Built {}x{} octi grid: {} nodes, {} edges",
            width,
            height,
            graph.nodes.len(),
            graph.edges.len()
        );
        graph
    }

    fn build_cell(&mut self, x: usize, y: usize) {
        let cell = CellId(self.cells.len());
        let first_node = self.nodes.len();
        let mut grid_node = GridNode::new(cell, x, y, first_node);

        for d in 0..9 {
            let direction = Direction::from_index(d).unwrap_or(Direction::Sink);
            self.nodes.push(OctiNode {
                id: OctiNodeId(first_node + d),
                cell,
                direction,
                edges: Vec::new(),
            });
        }

        for (i, a) in PORTS.into_iter().enumerate() {
            for b in PORTS.into_iter().skip(i + 1) {
                let edge = self.add_edge(grid_node.node(a), grid_node.node(b), bend_cost(a.octi_angle(b)));
                grid_node.bend_edges.push(edge);
            }
            grid_node.sink_edges[i] = self.add_edge(grid_node.node(a), grid_node.sink(), COST_SINK);
        }

        self.cells.push(grid_node);
    }

    fn add_edge(&mut self, a: OctiNodeId, b: OctiNodeId, weight: f64) -> OctiEdgeId {
        let id = OctiEdgeId(self.edges.len());
        self.edges.push(OctiEdge::new(id, a, b, weight));
        self.nodes[a.0].edges.push(id);
        self.nodes[b.0].edges.push(id);
        id
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn has_node(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    pub fn cell_id(&self, x: usize, y: usize) -> CellId {
        assert!(
            x < self.width && y < self.height,
            "grid cell ({}, {}) outside {}x{} grid",
            x,
            y,
            self.width,
            self.height
        );
        CellId(y * self.width + x)
    }

    /// Out-of-range coordinates are a caller error; check with `has_node` first.
    pub fn get_node(&self, x: usize, y: usize) -> &GridNode {
        &self.cells[self.cell_id(x, y).0]
    }

    pub fn cell(&self, id: CellId) -> &GridNode {
        &self.cells[id.0]
    }

    pub fn cell_mut(&mut self, id: CellId) -> &mut GridNode {
        &mut self.cells[id.0]
    }

    pub fn cells(&self) -> impl Iterator<Item = &GridNode> {
        self.cells.iter()
    }

    pub fn neighbour(&self, cell: CellId, direction: Direction) -> Option<CellId> {
        if direction.is_sink() {
            return None;
        }
        let c = &self.cells[cell.0];
        let (dx, dy) = direction.offset();
        let (x, y) = (c.x as i64 + dx, c.y as i64 + dy);
        if self.has_node(x, y) {
            Some(self.cell_id(x as usize, y as usize))
        } else {
            None
        }
    }

    pub fn node(&self, id: OctiNodeId) -> &OctiNode {
        &self.nodes[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge(&self, id: OctiEdgeId) -> &OctiEdge {
        &self.edges[id.0]
    }

    pub fn edge_mut(&mut self, id: OctiEdgeId) -> &mut OctiEdge {
        &mut self.edges[id.0]
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn octi_node(&self, cell: CellId, direction: Direction) -> OctiNodeId {
        self.cells[cell.0].node(direction)
    }

    /// Edge directly joining two octi nodes, if any.
    pub fn get_edge(&self, a: OctiNodeId, b: OctiNodeId) -> Option<OctiEdgeId> {
        self.nodes
            .get(a.0)?
            .edges
            .iter()
            .copied()
            .find(|&e| self.edges[e.0].other(a) == b)
    }

    /// Grid coordinates of the cell owning `node`.
    pub fn node_position(&self, node: OctiNodeId) -> (usize, usize) {
        let cell = &self.cells[self.nodes[node.0].cell.0];
        (cell.x, cell.y)
    }

    /// True for hop edges between diagonally adjacent cells.
    pub fn is_diagonal_hop(&self, edge: OctiEdgeId) -> bool {
        self.diagonal_cells(edge).is_some()
    }

    fn diagonal_cells(&self, edge: OctiEdgeId) -> Option<((i64, i64), (i64, i64))> {
        let e = self.edges.get(edge.0)?;
        let (ax, ay) = self.node_position(e.a);
        let (bx, by) = self.node_position(e.b);
        let (ax, ay, bx, by) = (ax as i64, ay as i64, bx as i64, by as i64);
        if (bx - ax).abs() == 1 && (by - ay).abs() == 1 {
            Some(((ax, ay), (bx, by)))
        } else {
            None
        }
    }

    /// The diagonal hop that crosses `edge` inside the same 2x2 block of cells.
    pub fn get_diagonal(&self, edge: OctiEdgeId) -> Option<OctiEdgeId> {
        let ((ax, ay), (bx, by)) = self.diagonal_cells(edge)?;
        let (dx, dy) = (bx - ax, by - ay);

        // The crossing diagonal runs from (ax + dx, ay) to (ax, ay + dy).
        let (cx, cy) = (ax + dx, ay);
        let (ox, oy) = (ax, ay + dy);
        let port = Direction::from_offset(ox - cx, oy - cy)?;

        let from = self.octi_node(self.cell_id(cx as usize, cy as usize), port);
        let to = self.octi_node(self.cell_id(ox as usize, oy as usize), port.opposite());
        self.get_edge(from, to)
    }

    /// Price or forbid the crossing counterpart of a diagonal hop that a path now uses.
    pub fn close_diagonal_edge(&mut self, edge: OctiEdgeId, allow_crossing: bool) {
        let Some(crossing) = self.get_diagonal(edge) else {
            return;
        };
        let weight = if allow_crossing {
            COST_CROSSING
        } else {
            f64::INFINITY
        };
        self.edges[crossing.0].set_weight(weight);
    }
}
