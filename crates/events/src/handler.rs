use duobundle_core::Aggregate;

/// Run one command against an aggregate: decide, then apply each resulting
/// event in order. A rejected command leaves the aggregate as it was.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: Aggregate,
{
    let decided = aggregate.handle(command)?;
    decided.iter().for_each(|event| aggregate.apply(event));
    Ok(decided)
}
