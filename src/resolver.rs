use std::collections::HashMap;

use crate::{model::index_records, FamilyRelationships, Gedcom, Xref};

/// Maps each child to the families listing it, in source order.
fn child_index(families: &[crate::Family]) -> HashMap<Xref, Vec<usize>> {
    let mut index: HashMap<Xref, Vec<usize>> = HashMap::new();
    for (position, family) in families.iter().enumerate() {
        for child in &family.relationships.children {
            index.entry(child.clone()).or_default().push(position);
        }
    }
    index
}

/// Two families can be merged if one has only a husband and the other only a
/// wife.
fn complementary(a: &FamilyRelationships, b: &FamilyRelationships) -> bool {
    matches!(
        (&a.husband, &a.wife, &b.husband, &b.wife),
        (Some(_), None, None, Some(_)) | (None, Some(_), Some(_), None)
    )
}

impl Gedcom {
    /// Turns the family pointers into links between individuals: parents and
    /// children, spouses, and merged families split across two records.
    ///
    /// Resolving an already resolved model changes nothing.
    pub(crate) fn resolve(&mut self) {
        self.link_families();
        self.reconcile_families();
        self.unify_siblings();
    }

    fn known(&self, id: &Option<Xref>) -> Option<Xref> {
        id.as_ref()
            .filter(|id| self.individual_index.contains_key(&***id))
            .cloned()
    }

    fn add_child(&mut self, parent: &Xref, child: &Xref) {
        if let Some(&position) = self.individual_index.get(&**parent) {
            let children = &mut self.individuals[position].relationships.children;
            if !children.contains(child) {
                children.push(child.clone());
            }
        }
    }

    /// Sets father, mother and spouse from every family, keeping the first
    /// value seen for each.
    fn link_families(&mut self) {
        for position in 0..self.families.len() {
            let relationships = &self.families[position].relationships;
            let husband = self.known(&relationships.husband);
            let wife = self.known(&relationships.wife);
            let children = relationships.children.clone();

            if let (Some(husband), Some(wife)) = (&husband, &wife) {
                self.link_spouses(husband, wife, false);
            }
            for child in &children {
                let Some(&c) = self.individual_index.get(&**child) else {
                    log::debug!(
                        "Unresolved child {} in family {}",
                        child,
                        self.families[position].id
                    );
                    continue;
                };
                if let Some(husband) = &husband {
                    let father = &mut self.individuals[c].relationships.father;
                    if father.is_none() {
                        *father = Some(husband.clone());
                    }
                    self.add_child(husband, child);
                }
                if let Some(wife) = &wife {
                    let mother = &mut self.individuals[c].relationships.mother;
                    if mother.is_none() {
                        *mother = Some(wife.clone());
                    }
                    self.add_child(wife, child);
                }
            }
        }
    }

    fn link_spouses(&mut self, husband: &Xref, wife: &Xref, overwrite: bool) {
        for (one, other) in [(husband, wife), (wife, husband)] {
            if let Some(&position) = self.individual_index.get(&**one) {
                let spouse = &mut self.individuals[position].relationships.spouse;
                if overwrite || spouse.is_none() {
                    *spouse = Some(other.clone());
                }
            }
        }
    }

    /// Merges families that share a child when one has only a husband and the
    /// other only a wife. The earlier family absorbs the later one, which is
    /// removed.
    fn reconcile_families(&mut self) {
        let child_index = child_index(&self.families);
        let mut merged = vec![false; self.families.len()];
        for position in 0..self.families.len() {
            if merged[position] {
                continue;
            }
            let children = self.families[position].relationships.children.clone();
            for child in &children {
                for &other in child_index.get(child).into_iter().flatten() {
                    if other == position || merged[other] {
                        continue;
                    }
                    if complementary(
                        &self.families[position].relationships,
                        &self.families[other].relationships,
                    ) {
                        self.merge_family(position, other);
                        merged[other] = true;
                    }
                }
            }
        }
        if merged.contains(&true) {
            let mut flags = merged.into_iter();
            self.families
                .retain(|_| !flags.next().unwrap_or(false));
            self.family_index = index_records(&self.families);
        }
    }

    fn merge_family(&mut self, survivor: usize, absorbed: usize) {
        let absorbed_relationships = std::mem::take(&mut self.families[absorbed].relationships);
        let absorbed_fields = std::mem::take(&mut self.families[absorbed].fields);
        log::debug!(
            "Merged family {} into {}",
            self.families[absorbed].id,
            self.families[survivor].id
        );

        let family = &mut self.families[survivor];
        for (tag, field) in absorbed_fields {
            family.fields.entry(tag).or_insert(field);
        }
        let relationships = &mut family.relationships;
        if relationships.husband.is_none() {
            relationships.husband = absorbed_relationships.husband;
        }
        if relationships.wife.is_none() {
            relationships.wife = absorbed_relationships.wife;
        }
        for child in absorbed_relationships.children {
            if !relationships.children.contains(&child) {
                relationships.children.push(child);
            }
        }

        let relationships = &self.families[survivor].relationships;
        let husband = self.known(&relationships.husband);
        let wife = self.known(&relationships.wife);
        let children = relationships.children.clone();
        if let (Some(husband), Some(wife)) = (&husband, &wife) {
            self.link_spouses(husband, wife, true);
        }
        for child in &children {
            let Some(&c) = self.individual_index.get(&**child) else {
                continue;
            };
            if let Some(husband) = &husband {
                self.individuals[c].relationships.father = Some(husband.clone());
                self.add_child(husband, child);
            }
            if let Some(wife) = &wife {
                self.individuals[c].relationships.mother = Some(wife.clone());
                self.add_child(wife, child);
            }
        }
    }

    /// Gives both parents of every child the union of their children lists,
    /// repeated until no list grows.
    fn unify_siblings(&mut self) {
        loop {
            let mut changed = false;
            for position in 0..self.individuals.len() {
                let relationships = &self.individuals[position].relationships;
                let (Some(father), Some(mother)) = (&relationships.father, &relationships.mother)
                else {
                    continue;
                };
                let (Some(&f), Some(&m)) = (
                    self.individual_index.get(&**father),
                    self.individual_index.get(&**mother),
                ) else {
                    continue;
                };
                if f == m {
                    continue;
                }
                let mut union = self.individuals[f].relationships.children.clone();
                for child in &self.individuals[m].relationships.children {
                    if !union.contains(child) {
                        union.push(child.clone());
                    }
                }
                for parent in [f, m] {
                    let children = &mut self.individuals[parent].relationships.children;
                    if *children != union {
                        *children = union.clone();
                        changed = true;
                    }
                }
            }
            if !changed {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Gedcom, Xref};
    use proptest::prelude::*;

    fn ids(list: &[Xref]) -> Vec<&str> {
        list.iter().map(|id| &**id).collect()
    }

    fn resolved(text: &str) -> Gedcom {
        Gedcom::parse(text).unwrap()
    }

    const NUCLEAR: &str = "0 @I1@ INDI\n1 NAME Father\n0 @I2@ INDI\n1 NAME Mother\n\
                           0 @I3@ INDI\n1 NAME Son\n0 @I4@ INDI\n1 NAME Daughter\n\
                           0 @F1@ FAM\n1 HUSB @I1@\n1 WIFE @I2@\n1 CHIL @I3@\n1 CHIL @I4@\n";

    #[test]
    fn links_parents_and_children() {
        let gedcom = resolved(NUCLEAR);
        for child in ["@I3@", "@I4@"] {
            let relationships = gedcom.individual(child).unwrap().relationships();
            assert_eq!(relationships.father().as_deref(), Some("@I1@"));
            assert_eq!(relationships.mother().as_deref(), Some("@I2@"));
        }
        let father = gedcom.individual("@I1@").unwrap().relationships();
        assert_eq!(ids(father.children()), vec!["@I3@", "@I4@"]);
        assert_eq!(father.spouse().as_deref(), Some("@I2@"));
        let mother = gedcom.individual("@I2@").unwrap().relationships();
        assert_eq!(ids(mother.children()), vec!["@I3@", "@I4@"]);
        assert_eq!(mother.spouse().as_deref(), Some("@I1@"));
        assert_eq!(gedcom.families().len(), 1);
    }

    #[test]
    fn merges_split_families() {
        let gedcom = resolved(
            "0 @I1@ INDI\n0 @I2@ INDI\n0 @I3@ INDI\n\
             0 @F1@ FAM\n1 HUSB @I1@\n1 CHIL @I3@\n\
             0 @F2@ FAM\n1 WIFE @I2@\n1 CHIL @I3@\n",
        );
        assert_eq!(gedcom.families().len(), 1);
        assert!(gedcom.family("@F2@").is_none());
        let family = gedcom.family("@F1@").unwrap().relationships();
        assert_eq!(family.husband().as_deref(), Some("@I1@"));
        assert_eq!(family.wife().as_deref(), Some("@I2@"));
        assert_eq!(ids(family.children()), vec!["@I3@"]);

        let child = gedcom.individual("@I3@").unwrap().relationships();
        assert_eq!(child.father().as_deref(), Some("@I1@"));
        assert_eq!(child.mother().as_deref(), Some("@I2@"));
        let husband = gedcom.individual("@I1@").unwrap().relationships();
        let wife = gedcom.individual("@I2@").unwrap().relationships();
        assert_eq!(husband.spouse().as_deref(), Some("@I2@"));
        assert_eq!(wife.spouse().as_deref(), Some("@I1@"));
        assert_eq!(ids(husband.children()), vec!["@I3@"]);
        assert_eq!(ids(wife.children()), vec!["@I3@"]);
    }

    #[test]
    fn merge_absorbs_children_of_both_records() {
        let gedcom = resolved(
            "0 @I1@ INDI\n0 @I2@ INDI\n0 @I3@ INDI\n0 @I4@ INDI\n\
             0 @F1@ FAM\n1 WIFE @I2@\n1 CHIL @I3@\n\
             0 @F2@ FAM\n1 HUSB @I1@\n1 CHIL @I3@\n1 CHIL @I4@\n1 MARR\n2 DATE 1890\n",
        );
        let family = gedcom.family("@F1@").unwrap();
        assert_eq!(ids(family.relationships().children()), vec!["@I3@", "@I4@"]);
        assert_eq!(family.field("MARR").and_then(|m| m.detail("DATE")), Some("1890"));
        let younger = gedcom.individual("@I4@").unwrap().relationships();
        assert_eq!(younger.father().as_deref(), Some("@I1@"));
        assert_eq!(younger.mother().as_deref(), Some("@I2@"));
    }

    #[test]
    fn does_not_merge_complete_or_same_role_families() {
        let gedcom = resolved(
            "0 @I1@ INDI\n0 @I2@ INDI\n0 @I3@ INDI\n0 @I5@ INDI\n\
             0 @F1@ FAM\n1 HUSB @I1@\n1 WIFE @I2@\n1 CHIL @I3@\n\
             0 @F2@ FAM\n1 WIFE @I5@\n1 CHIL @I3@\n\
             0 @F3@ FAM\n1 WIFE @I2@\n1 CHIL @I3@\n",
        );
        assert_eq!(gedcom.families().len(), 3);
    }

    #[test]
    fn first_seen_family_wins_ambiguous_merges() {
        let gedcom = resolved(
            "0 @I1@ INDI\n0 @I2@ INDI\n0 @I3@ INDI\n0 @I4@ INDI\n\
             0 @F1@ FAM\n1 HUSB @I1@\n1 CHIL @I3@\n\
             0 @F2@ FAM\n1 WIFE @I2@\n1 CHIL @I3@\n\
             0 @F3@ FAM\n1 WIFE @I4@\n1 CHIL @I3@\n",
        );
        let remaining: Vec<&str> = gedcom.families().iter().map(|f| &**f.id()).collect();
        assert_eq!(remaining, vec!["@F1@", "@F3@"]);
        assert_eq!(
            gedcom.family("@F1@").unwrap().relationships().wife().as_deref(),
            Some("@I2@")
        );
        let child = gedcom.individual("@I3@").unwrap().relationships();
        assert_eq!(child.father().as_deref(), Some("@I1@"));
        assert_eq!(child.mother().as_deref(), Some("@I2@"));
        // The losing family still lists the child under its wife.
        let other = gedcom.individual("@I4@").unwrap().relationships();
        assert_eq!(ids(other.children()), vec!["@I3@"]);
    }

    #[test]
    fn unifies_children_of_both_parents() {
        let gedcom = resolved(
            "0 @I1@ INDI\n0 @I2@ INDI\n0 @I3@ INDI\n0 @I4@ INDI\n\
             0 @F1@ FAM\n1 HUSB @I1@\n1 WIFE @I2@\n1 CHIL @I3@\n\
             0 @F2@ FAM\n1 HUSB @I1@\n1 CHIL @I4@\n",
        );
        let father = gedcom.individual("@I1@").unwrap().relationships();
        let mother = gedcom.individual("@I2@").unwrap().relationships();
        assert_eq!(ids(father.children()), vec!["@I3@", "@I4@"]);
        assert_eq!(father.children(), mother.children());
        let half = gedcom.individual("@I4@").unwrap().relationships();
        assert_eq!(half.mother(), &None);
    }

    #[test]
    fn leaves_unresolved_references_dangling() {
        let gedcom = resolved(
            "0 @I1@ INDI\n0 @F1@ FAM\n1 HUSB @I1@\n1 WIFE @I9@\n1 CHIL @I8@\n",
        );
        let family = gedcom.family("@F1@").unwrap().relationships();
        assert_eq!(family.wife().as_deref(), Some("@I9@"));
        assert_eq!(ids(family.children()), vec!["@I8@"]);
        assert!(gedcom.individual("@I8@").is_none());
        let husband = gedcom.individual("@I1@").unwrap().relationships();
        assert!(husband.children().is_empty());
        assert_eq!(husband.spouse(), &None);
    }

    #[test]
    fn degenerate_families_are_kept() {
        let gedcom = resolved("0 @F1@ FAM\n0 @F2@ FAM\n1 CHIL @I1@\n");
        assert_eq!(gedcom.families().len(), 2);
        assert!(gedcom.individuals().is_empty());
    }

    #[test]
    fn resolving_twice_changes_nothing() {
        let texts = [
            NUCLEAR,
            "0 @I1@ INDI\n0 @I2@ INDI\n0 @I3@ INDI\n0 @I4@ INDI\n0 @I5@ INDI\n\
             0 @F1@ FAM\n1 HUSB @I1@\n1 CHIL @I3@\n\
             0 @F2@ FAM\n1 WIFE @I2@\n1 CHIL @I3@\n\
             0 @F3@ FAM\n1 WIFE @I4@\n1 CHIL @I3@\n1 CHIL @I5@\n\
             0 @F4@ FAM\n1 HUSB @I1@\n1 WIFE @I4@\n1 CHIL @I5@\n",
        ];
        for text in texts {
            let once = resolved(text);
            let mut twice = once.clone();
            twice.resolve();
            assert_eq!(once, twice);
        }
    }

    type Draft = (Option<usize>, Option<usize>, Vec<usize>);

    /// Declares `people` individuals and the given families. Indexes at or
    /// past `people` become dangling references.
    fn document(people: usize, families: &[Draft]) -> String {
        let mut text = String::from("0 HEAD\n");
        for i in 0..people {
            text.push_str(&format!("0 @I{}@ INDI\n1 NAME Person {}\n", i, i));
        }
        for (f, (husband, wife, children)) in families.iter().enumerate() {
            text.push_str(&format!("0 @F{}@ FAM\n", f));
            if let Some(husband) = husband {
                text.push_str(&format!("1 HUSB @I{}@\n", husband));
            }
            if let Some(wife) = wife {
                text.push_str(&format!("1 WIFE @I{}@\n", wife));
            }
            for child in children {
                text.push_str(&format!("1 CHIL @I{}@\n", child));
            }
        }
        text
    }

    fn families() -> impl Strategy<Value = Vec<Draft>> {
        prop::collection::vec(
            (
                prop::option::of(0..10usize),
                prop::option::of(0..10usize),
                prop::collection::vec(0..10usize, 0..4),
            ),
            0..7,
        )
    }

    proptest! {
        #[test]
        fn parents_list_their_children(people in 0..9usize, families in families()) {
            let gedcom = resolved(&document(people, &families));
            for individual in gedcom.individuals() {
                let relationships = individual.relationships();
                for parent in [relationships.father(), relationships.mother()].into_iter().flatten() {
                    let parent = gedcom.individual(parent).unwrap();
                    prop_assert!(parent.relationships().children().contains(individual.id()));
                }
            }
        }

        #[test]
        fn both_parents_share_one_children_list(people in 0..9usize, families in families()) {
            let gedcom = resolved(&document(people, &families));
            for individual in gedcom.individuals() {
                let relationships = individual.relationships();
                if let (Some(father), Some(mother)) = (relationships.father(), relationships.mother()) {
                    let father = gedcom.individual(father).unwrap().relationships();
                    let mother = gedcom.individual(mother).unwrap().relationships();
                    prop_assert_eq!(father.children(), mother.children());
                    prop_assert!(father.children().contains(individual.id()));
                }
            }
        }

        #[test]
        fn resolution_is_idempotent(people in 0..9usize, families in families()) {
            let once = resolved(&document(people, &families));
            let mut twice = once.clone();
            twice.resolve();
            prop_assert_eq!(once, twice);
        }
    }
}
