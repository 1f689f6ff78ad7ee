use crate::core::catalog::ServiceCatalog;
use crate::core::platform::PlatformGate;
use crate::domain::model::{InterfaceId, ServiceDescriptor};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

/// 由描述列表與 catalog 推導出的介面依賴圖
///
/// 只收錄 sequencer 會實際嘗試的描述：停用、平台不符、父服務被略過的子模組都不算，
/// 同一介面只取第一個宣告者（後續重複者會得到 AlreadyRegistered）。
/// 位於強連通分量上的介面會直接回報 CircularDependency 而不是嘗試建構。
#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<InterfaceId, Vec<InterfaceId>>,
    claimants: HashMap<InterfaceId, String>,
    cycles: HashMap<InterfaceId, Vec<InterfaceId>>,
}

impl DependencyGraph {
    pub fn build(
        descriptors: &[ServiceDescriptor],
        catalog: &ServiceCatalog,
        gate: &PlatformGate,
    ) -> Self {
        let mut graph = Self::default();
        for descriptor in descriptors {
            graph.collect(descriptor, catalog, gate);
        }
        graph.cycles = graph.find_cycles();
        graph
    }

    fn collect(&mut self, descriptor: &ServiceDescriptor, catalog: &ServiceCatalog, gate: &PlatformGate) {
        if !descriptor.enabled || !gate.is_eligible(descriptor) {
            return;
        }
        if self.claimants.contains_key(&descriptor.interface) {
            return;
        }

        self.claimants
            .insert(descriptor.interface.clone(), descriptor.name.clone());

        let mut dependencies: Vec<InterfaceId> = Vec::new();
        for dependency in catalog.dependencies_of(&descriptor.concrete).unwrap_or(&[]) {
            if !dependencies.contains(dependency) {
                dependencies.push(dependency.clone());
            }
        }
        self.edges.insert(descriptor.interface.clone(), dependencies);

        for module in &descriptor.modules {
            self.collect(module, catalog, gate);
        }
    }

    pub fn dependencies(&self, interface: &InterfaceId) -> &[InterfaceId] {
        self.edges.get(interface).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 位於循環上的介面 -> 經過該介面的循環路徑（首尾相同）
    pub fn cycles(&self) -> &HashMap<InterfaceId, Vec<InterfaceId>> {
        &self.cycles
    }

    /// 只有該介面的第一個宣告者會因循環失敗
    pub fn cycle_for(&self, descriptor: &ServiceDescriptor) -> Option<&Vec<InterfaceId>> {
        match self.claimants.get(&descriptor.interface) {
            Some(name) if *name == descriptor.name => self.cycles.get(&descriptor.interface),
            _ => None,
        }
    }

    pub fn has_cycle(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// 所有出現在圖中的介面（含外部依賴）
    pub fn nodes(&self) -> BTreeSet<&InterfaceId> {
        self.edges
            .iter()
            .flat_map(|(from, to)| std::iter::once(from).chain(to.iter()))
            .collect()
    }

    fn find_cycles(&self) -> HashMap<InterfaceId, Vec<InterfaceId>> {
        let mut tarjan = Tarjan::new(self);
        for interface in self.edges.keys() {
            if !tarjan.indices.contains_key(interface) {
                tarjan.strong_connect(interface);
            }
        }

        let mut cycles = HashMap::new();
        for component in &tarjan.components {
            let cyclic = component.len() > 1
                || component
                    .iter()
                    .any(|member| self.dependencies(member).contains(member));
            if !cyclic {
                continue;
            }

            let members: HashSet<&InterfaceId> = component.iter().copied().collect();
            for member in component {
                cycles.insert((*member).clone(), self.cycle_through(member, &members));
            }
        }
        cycles
    }

    /// 分量內從 start 出發回到 start 的最短路徑
    fn cycle_through(&self, start: &InterfaceId, members: &HashSet<&InterfaceId>) -> Vec<InterfaceId> {
        let mut previous: HashMap<&InterfaceId, &InterfaceId> = HashMap::new();
        let mut queue = VecDeque::from([start]);

        while let Some(node) = queue.pop_front() {
            for next in self.dependencies(node) {
                if !members.contains(next) {
                    continue;
                }
                if next == start {
                    let mut path = vec![start.clone()];
                    let mut cursor = node;
                    while cursor != start {
                        path.push(cursor.clone());
                        match previous.get(cursor) {
                            Some(&prev) => cursor = prev,
                            None => break,
                        }
                    }
                    path.push(start.clone());
                    path.reverse();
                    return path;
                }
                if !previous.contains_key(next) {
                    previous.insert(next, node);
                    queue.push_back(next);
                }
            }
        }

        vec![start.clone(), start.clone()]
    }
}

/// Tarjan 強連通分量
struct Tarjan<'g> {
    graph: &'g DependencyGraph,
    next_index: usize,
    indices: HashMap<&'g InterfaceId, usize>,
    lowlinks: HashMap<&'g InterfaceId, usize>,
    stack: Vec<&'g InterfaceId>,
    on_stack: HashSet<&'g InterfaceId>,
    components: Vec<Vec<&'g InterfaceId>>,
}

impl<'g> Tarjan<'g> {
    fn new(graph: &'g DependencyGraph) -> Self {
        Self {
            graph,
            next_index: 0,
            indices: HashMap::new(),
            lowlinks: HashMap::new(),
            stack: Vec::new(),
            on_stack: HashSet::new(),
            components: Vec::new(),
        }
    }

    fn strong_connect(&mut self, node: &'g InterfaceId) {
        let index = self.next_index;
        self.next_index += 1;
        self.indices.insert(node, index);
        self.lowlinks.insert(node, index);
        self.stack.push(node);
        self.on_stack.insert(node);

        let graph = self.graph;
        for next in graph.dependencies(node) {
            if let Some(&next_index) = self.indices.get(next) {
                if self.on_stack.contains(next) {
                    self.lower(node, next_index);
                }
            } else {
                self.strong_connect(next);
                let next_low = self.lowlinks.get(next).copied().unwrap_or(usize::MAX);
                self.lower(node, next_low);
            }
        }

        if self.lowlinks.get(node) == Some(&index) {
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack.remove(member);
                component.push(member);
                if member == node {
                    break;
                }
            }
            self.components.push(component);
        }
    }

    fn lower(&mut self, node: &'g InterfaceId, candidate: usize) {
        if let Some(low) = self.lowlinks.get_mut(node) {
            *low = (*low).min(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::ServiceFactory;
    use crate::domain::ports::Service;
    use std::sync::Arc;

    struct Noop;

    impl Service for Noop {}

    fn catalog(entries: &[(&str, &[&str])]) -> ServiceCatalog {
        let mut catalog = ServiceCatalog::new();
        for (concrete, deps) in entries {
            let mut factory =
                ServiceFactory::new(*concrete, |_, _| Ok(Arc::new(Noop) as Arc<dyn Service>));
            for dep in *deps {
                factory = factory.depends_on(*dep);
            }
            catalog.register_factory(factory).unwrap();
        }
        catalog
    }

    fn descriptor(name: &str) -> ServiceDescriptor {
        ServiceDescriptor::new(name, format!("I{}", name), name)
    }

    fn linux() -> PlatformGate {
        PlatformGate::new("linux")
    }

    #[test]
    fn test_acyclic_chain() {
        let catalog = catalog(&[("A", &[]), ("B", &["IA"]), ("C", &["IB"])]);
        let graph = DependencyGraph::build(
            &[descriptor("A"), descriptor("B"), descriptor("C")],
            &catalog,
            &linux(),
        );
        assert!(!graph.has_cycle());
        assert_eq!(graph.dependencies(&InterfaceId::new("IC")), &[InterfaceId::new("IB")]);
    }

    #[test]
    fn test_two_node_cycle() {
        let catalog = catalog(&[("A", &["IB"]), ("B", &["IA"]), ("C", &["IA"])]);
        let graph = DependencyGraph::build(
            &[descriptor("A"), descriptor("B"), descriptor("C")],
            &catalog,
            &linux(),
        );

        let cycles = graph.cycles();
        assert_eq!(cycles.len(), 2);
        let cycle_a = &cycles[&InterfaceId::new("IA")];
        assert_eq!(cycle_a.first(), cycle_a.last());
        assert_eq!(cycle_a.len(), 3);
        // C 只依賴循環，本身不在循環上
        assert!(!cycles.contains_key(&InterfaceId::new("IC")));
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let catalog = catalog(&[("A", &["IA"])]);
        let graph = DependencyGraph::build(&[descriptor("A")], &catalog, &linux());
        assert_eq!(
            graph.cycles()[&InterfaceId::new("IA")],
            vec![InterfaceId::new("IA"), InterfaceId::new("IA")]
        );
    }

    #[test]
    fn test_member_reached_through_finished_node() {
        // D 經由已走完的 B 回到循環：D -> B -> C -> A -> D
        let catalog = catalog(&[
            ("A", &["IB", "ID"]),
            ("B", &["IC"]),
            ("C", &["IA"]),
            ("D", &["IB"]),
        ]);
        let graph = DependencyGraph::build(
            &[descriptor("A"), descriptor("B"), descriptor("C"), descriptor("D")],
            &catalog,
            &linux(),
        );

        let cycles = graph.cycles();
        assert_eq!(cycles.len(), 4);
        let cycle_d = &cycles[&InterfaceId::new("ID")];
        assert_eq!(cycle_d.first(), Some(&InterfaceId::new("ID")));
        assert_eq!(cycle_d.last(), Some(&InterfaceId::new("ID")));
        for pair in cycle_d.windows(2) {
            assert!(graph.dependencies(&pair[0]).contains(&pair[1]));
        }
    }

    #[test]
    fn test_duplicate_interface_does_not_add_edges() {
        let catalog = catalog(&[("A", &[]), ("B", &["IA"]), ("A2", &["IB"])]);
        let graph = DependencyGraph::build(
            &[
                descriptor("A"),
                descriptor("B"),
                ServiceDescriptor::new("A2", "IA", "A2"),
            ],
            &catalog,
            &linux(),
        );

        assert!(!graph.has_cycle());
        assert!(graph.dependencies(&InterfaceId::new("IA")).is_empty());
    }

    #[test]
    fn test_skipped_descriptors_are_left_out() {
        let catalog = catalog(&[("A", &["IB"]), ("B", &["IA"]), ("M", &["IA"])]);
        let disabled = DependencyGraph::build(
            &[descriptor("A"), descriptor("B").disabled()],
            &catalog,
            &linux(),
        );
        assert!(!disabled.has_cycle());

        let excluded = DependencyGraph::build(
            &[descriptor("A"), descriptor("B").with_platforms(["android"])],
            &catalog,
            &linux(),
        );
        assert!(!excluded.has_cycle());

        // 父服務被略過時，子模組的邊也不存在
        let orphan = DependencyGraph::build(
            &[descriptor("B").disabled().with_module(descriptor("M"))],
            &catalog,
            &linux(),
        );
        assert!(orphan.dependencies(&InterfaceId::new("IM")).is_empty());
    }

    #[test]
    fn test_cycle_only_blocks_first_claimant() {
        let catalog = catalog(&[("A", &["IA"]), ("Other", &[])]);
        let duplicate = ServiceDescriptor::new("Other", "IA", "Other");
        let graph = DependencyGraph::build(&[descriptor("A"), duplicate.clone()], &catalog, &linux());

        assert!(graph.cycle_for(&descriptor("A")).is_some());
        assert!(graph.cycle_for(&duplicate).is_none());
    }

    #[test]
    fn test_modules_contribute_edges() {
        let catalog = catalog(&[("A", &[]), ("M", &["IA"])]);
        let root = descriptor("A").with_module(descriptor("M"));
        let graph = DependencyGraph::build(&[root], &catalog, &linux());

        assert_eq!(graph.dependencies(&InterfaceId::new("IM")), &[InterfaceId::new("IA")]);
        assert_eq!(graph.nodes().len(), 2);
    }
}
